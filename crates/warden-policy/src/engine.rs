//! Statement-based policy engine over the role-keyed cache.
//!
//! `CachedPolicyEngine` implements the `PolicyEngine` trait from warden-core.
//!
//! Evaluation algorithm:
//!
//! 1. Reject a request with an empty role, resource, or action.
//! 2. Look up the candidate documents for the request's role (role bucket
//!    plus wildcard bucket). None at all → deny "no policies found for role".
//! 3. Test every statement of every candidate. A statement matches when its
//!    principal, action pattern, resource pattern, and every condition match.
//! 4. Any matching `Deny` → deny "denied by policy", regardless of order.
//!    Otherwise any matching `Allow` → allow "allowed by policy".
//!    Otherwise deny "no matching policy found".
//!
//! Mutations go straight to the store and always finish with a full cache
//! reload.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_contracts::{
    error::WardenResult,
    policy::{Condition, Effect, PolicyDocument, PolicyStatement},
    request::{keys, PermissionRequest, PermissionResponse},
};
use warden_core::traits::{PolicyEngine, PolicyStore};

use crate::cache::{CacheStats, PolicyCache};

/// A `PolicyEngine` backed by a `PolicyCache`.
///
/// ```rust,ignore
/// let store: Arc<dyn PolicyStore> = Arc::new(InMemoryPolicyStore::new());
/// let engine = CachedPolicyEngine::new(store)?;
/// let response = engine.decide(&request);
/// ```
pub struct CachedPolicyEngine {
    cache: PolicyCache,
}

impl CachedPolicyEngine {
    /// Build an engine over `store` and perform the initial load.
    pub fn new(store: Arc<dyn PolicyStore>) -> WardenResult<Self> {
        let engine = Self::with_cache(PolicyCache::new(store));
        engine.reload()?;
        Ok(engine)
    }

    /// Wrap an existing cache without loading it.
    pub fn with_cache(cache: PolicyCache) -> Self {
        Self { cache }
    }

    pub fn cache_stats(&self) -> WardenResult<CacheStats> {
        self.cache.stats()
    }

    /// Decide one request, treating a broken cache as a deny.
    ///
    /// Use `PolicyEngine::evaluate` where a failed lookup must stay
    /// distinguishable from a refusal.
    pub fn decide(&self, request: &PermissionRequest) -> PermissionResponse {
        self.try_decide(request).unwrap_or_else(|e| {
            warn!(role = %request.role, error = %e, "policy lookup failed; denying");
            PermissionResponse::deny(PermissionResponse::NO_POLICIES_FOR_ROLE)
        })
    }

    /// Decide one request. Fails only when the cache cannot be read; every
    /// policy outcome, including a malformed request, is an `Ok` response.
    pub fn try_decide(&self, request: &PermissionRequest) -> WardenResult<PermissionResponse> {
        if !request.is_well_formed() {
            warn!(
                role = %request.role,
                resource = %request.resource,
                action = %request.action,
                "rejecting malformed permission request"
            );
            return Ok(PermissionResponse::deny(PermissionResponse::INVALID_REQUEST));
        }

        let candidates = self.cache.lookup(&request.role)?;

        let response = if candidates.is_empty() {
            PermissionResponse::deny(PermissionResponse::NO_POLICIES_FOR_ROLE)
        } else {
            Self::resolve(&candidates, request)
        };

        info!(
            role = %request.role,
            resource = %request.resource,
            action = %request.action,
            resource_id = request.target_id().unwrap_or(""),
            allowed = response.allowed,
            reason = %response.reason,
            "policy evaluated"
        );
        Ok(response)
    }

    fn resolve(candidates: &[Arc<PolicyDocument>], request: &PermissionRequest) -> PermissionResponse {
        let mut allows = Vec::new();
        let mut denies = Vec::new();

        for doc in candidates {
            for statement in doc.statements.iter().filter(|s| statement_matches(s, request)) {
                debug!(
                    policy = %doc.name,
                    statement_id = %statement.id,
                    effect = %statement.effect,
                    "statement matched"
                );
                match statement.effect {
                    Effect::Allow => allows.push(doc.name.clone()),
                    Effect::Deny => denies.push(doc.name.clone()),
                }
            }
        }

        if !denies.is_empty() {
            PermissionResponse {
                allowed: false,
                reason: PermissionResponse::DENIED_BY_POLICY.to_string(),
                policies: denies,
            }
        } else if !allows.is_empty() {
            PermissionResponse {
                allowed: true,
                reason: PermissionResponse::ALLOWED_BY_POLICY.to_string(),
                policies: allows,
            }
        } else {
            PermissionResponse::deny(PermissionResponse::NO_MATCHING_POLICY)
        }
    }

    /// Validate `policy`, store it, and reload the cache.
    pub fn add_policy(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
        policy.validate()?;
        let stored = self.cache.store().create(policy)?;
        info!(policy = %stored.name, "policy added");
        self.reload()?;
        Ok(stored)
    }

    /// Replace a stored document and its statements, then reload.
    pub fn update_policy(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
        policy.validate()?;
        let stored = self.cache.store().update(policy)?;
        self.reload()?;
        Ok(stored)
    }

    /// Delete a document and its statements, then reload.
    pub fn remove_policy(&self, id: Uuid) -> WardenResult<()> {
        self.cache.store().delete(id)?;
        info!(policy_id = %id, "policy removed");
        self.reload()
    }

    /// Rebuild the cache from the store's active documents.
    pub fn reload(&self) -> WardenResult<()> {
        self.cache.load()
    }
}

impl PolicyEngine for CachedPolicyEngine {
    fn evaluate(&self, request: &PermissionRequest) -> WardenResult<PermissionResponse> {
        self.try_decide(request)
    }

    /// Bypasses the cache and reads the store directly.
    fn policies_for_role(&self, role: &str) -> WardenResult<Vec<PolicyDocument>> {
        self.cache.store().get_by_role(role)
    }
}

fn statement_matches(statement: &PolicyStatement, request: &PermissionRequest) -> bool {
    statement.principal.matches(&request.role)
        && statement.action.matches(&request.action)
        && statement.resource.matches(&request.resource)
        && statement
            .conditions
            .iter()
            .all(|c| condition_matches(c, request))
}

fn condition_matches(condition: &Condition, request: &PermissionRequest) -> bool {
    match condition {
        Condition::AttributeEquals { key, value } => request.context.get(key) == Some(value),
        Condition::ResourceOwnership => match request.target_id() {
            // Collection-level requests have no owner to check.
            None => true,
            Some(_) => matches!(
                request.context.get(keys::RESOURCE_OWNER_ID),
                Some(Value::String(owner)) if *owner == request.user_id.to_string()
            ),
        },
    }
}
