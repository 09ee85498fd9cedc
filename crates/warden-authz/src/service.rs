//! The authorization service: the façade handlers, guards and repositories
//! call instead of talking to the engine directly.
//!
//! Every check resolves the caller's role from the explicit `AuthContext`,
//! builds a `PermissionRequest` with the caller's identity flattened into
//! its context map, and turns the engine's decision into `Ok(())` or a
//! structured `WardenError`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::Effect,
    request::{keys, AuthContext, Permission, PermissionRequest},
    role::Role,
};
use warden_core::traits::{AccessControl, PolicyEngine};

use crate::propagation;

/// Authorization façade over a `PolicyEngine`.
pub struct AuthorizationService {
    engine: Arc<dyn PolicyEngine>,
    known_roles: Vec<String>,
}

impl AuthorizationService {
    /// A service recognizing the built-in roles (`admin`, `user`).
    pub fn new(engine: Arc<dyn PolicyEngine>) -> Self {
        Self {
            engine,
            known_roles: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }

    /// Replace the role set `validate_role` accepts.
    pub fn with_known_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn known_roles(&self) -> &[String] {
        &self.known_roles
    }

    // ── Checks ───────────────────────────────────────────────────────────────

    /// Like `check_resource_permission`, with extra attributes merged into
    /// the request context, e.g. `resource_owner_id` for ownership rules.
    ///
    /// Identity keys built from `ctx` take precedence over `attributes`.
    pub fn check_resource_permission_with(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        resource: &str,
        action: &str,
        resource_id: &str,
        attributes: BTreeMap<String, Value>,
    ) -> WardenResult<()> {
        let role = require_role(ctx)?;

        let mut context = attributes;
        context.extend(build_context(ctx, resource_id));

        let request = PermissionRequest {
            context,
            ..PermissionRequest::new(user_id, role, resource, action).for_resource(resource_id)
        };

        let response = self.engine.evaluate(&request).map_err(|e| {
            warn!(role = %role, resource = %resource, action = %action, error = %e, "policy evaluation failed");
            WardenError::PolicyEvaluationFailed { reason: e.to_string() }
        })?;

        if response.allowed {
            debug!(user_id = %user_id, role = %role, resource = %resource, action = %action, "access granted");
            return Ok(());
        }

        Err(WardenError::PermissionDenied {
            role: role.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            reason: response.reason,
            user_id: Some(user_id.to_string()),
        })
    }

    /// `true` iff a caller holding only `role` may perform `action` on
    /// `resource`. For checks outside any request, such as seed scripts.
    pub fn quick_check(&self, role: &str, resource: &str, action: &str) -> bool {
        self.check_permission(&AuthContext::with_role(role), Uuid::new_v4(), resource, action)
            .is_ok()
    }

    /// `Ok(())` only for a role in the known set.
    pub fn validate_role(&self, role: &str) -> WardenResult<()> {
        if self.known_roles.iter().any(|r| r == role) {
            Ok(())
        } else {
            Err(WardenError::RoleNotFound { role: role.to_string() })
        }
    }

    // ── Permission listings ──────────────────────────────────────────────────

    /// Every Allow statement of the documents that apply to the caller's
    /// role, tagged with that role.
    ///
    /// Reads the store directly, so documents written since the last cache
    /// reload are listed even though `check_permission` does not honor
    /// them yet.
    pub fn get_user_permissions(&self, ctx: &AuthContext, _user_id: Uuid) -> WardenResult<Vec<Permission>> {
        let role = require_role(ctx)?;
        let documents = self.engine.policies_for_role(role)?;

        Ok(documents
            .iter()
            .flat_map(|doc| doc.statements.iter())
            .filter(|s| s.effect == Effect::Allow)
            .map(|s| Permission {
                resource: s.resource.to_string(),
                action: s.action.to_string(),
                role: role.to_string(),
                resource_id: None,
            })
            .collect())
    }

    /// The subset of `get_user_permissions` the engine still allows under
    /// the caller's current context.
    pub fn get_effective_permissions(&self, ctx: &AuthContext, user_id: Uuid) -> WardenResult<Vec<Permission>> {
        let permissions = self.get_user_permissions(ctx, user_id)?;
        let role = require_role(ctx)?;
        let context = build_context(ctx, "");

        Ok(permissions
            .into_iter()
            .filter(|p| {
                let request = PermissionRequest {
                    context: context.clone(),
                    ..PermissionRequest::new(user_id, role, p.resource.as_str(), p.action.as_str())
                };
                matches!(self.engine.evaluate(&request), Ok(response) if response.allowed)
            })
            .collect())
    }

    /// Actions `role` is granted on exactly `resource`, per the stored
    /// Allow statements.
    pub fn get_allowed_actions_for_role(&self, role: &str, resource: &str) -> WardenResult<Vec<String>> {
        let ctx = AuthContext::with_role(role);
        Ok(self
            .get_user_permissions(&ctx, Uuid::new_v4())?
            .into_iter()
            .filter(|p| p.resource == resource)
            .map(|p| p.action)
            .collect())
    }

    // ── Context helpers ──────────────────────────────────────────────────────

    /// Derive a context carrying `user_id` and `role`, plus `email` when
    /// non-empty. The client IP is kept from `base`.
    pub fn create_enriched_context(
        &self,
        base: &AuthContext,
        user_id: Uuid,
        role: &str,
        email: &str,
    ) -> AuthContext {
        AuthContext {
            user_id: Some(user_id),
            role: Some(role.to_string()),
            email: if email.is_empty() { base.email.clone() } else { Some(email.to_string()) },
            client_ip: base.client_ip.clone(),
        }
    }

    /// See [`propagation::serialize_context`].
    pub fn serialize_context(&self, ctx: &AuthContext) -> WardenResult<String> {
        propagation::serialize_context(ctx)
    }

    /// See [`propagation::context_from_serialized`].
    pub fn context_from_serialized(&self, base: &AuthContext, data: &str) -> WardenResult<AuthContext> {
        propagation::context_from_serialized(base, data)
    }
}

impl AccessControl for AuthorizationService {
    fn check_permission(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> WardenResult<()> {
        self.check_resource_permission_with(ctx, user_id, resource, action, "", BTreeMap::new())
    }

    fn check_resource_permission(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        resource: &str,
        action: &str,
        resource_id: &str,
    ) -> WardenResult<()> {
        self.check_resource_permission_with(ctx, user_id, resource, action, resource_id, BTreeMap::new())
    }
}

fn require_role(ctx: &AuthContext) -> WardenResult<&str> {
    ctx.role().ok_or(WardenError::RoleMissing)
}

/// The attribute map attached to every request: the caller's identity and,
/// when non-empty, the targeted resource id.
pub fn build_context(ctx: &AuthContext, resource_id: &str) -> BTreeMap<String, Value> {
    let mut context = ctx.attributes();
    if !resource_id.is_empty() {
        context.insert(keys::RESOURCE_ID.to_string(), Value::String(resource_id.to_string()));
    }
    context
}
