//! The guarded repository: access-checked, audited CRUD.
//!
//! `GuardedRepository` wraps any `EntityStore` and enforces the same
//! ordering on every operation:
//!
//!   AccessControl → EntityStore → AuditLogger
//!
//! The store is never touched unless the access check passes. Audit
//! failures on writes (create, update, delete) fail the operation; audit
//! failures on reads (get, list) are logged and swallowed.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use warden_contracts::{
    audit::AccessEvent,
    error::{WardenError, WardenResult},
    request::AuthContext,
    role::{action, resource_token},
};

use crate::traits::{AccessControl, AuditLogger, Entity, EntityStore};

/// Pagination bounds applied to `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    /// Clamp `limit` into `1..=MAX_LIMIT`; zero falls back to `DEFAULT_LIMIT`.
    pub fn new(limit: usize, offset: usize) -> Self {
        let limit = match limit {
            0 => Self::DEFAULT_LIMIT,
            n => n.min(Self::MAX_LIMIT),
        };
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// CRUD over one resource class, gated by `AccessControl` and audited.
///
/// The resource name (e.g. `"product"`) is combined with each action into
/// the resource token checked against policy, e.g. `"product:update"`.
pub struct GuardedRepository<T: Entity, S: EntityStore<T>> {
    store: S,
    access: Option<Arc<dyn AccessControl>>,
    audit: Option<Arc<dyn AuditLogger>>,
    resource_name: String,
    _entity: PhantomData<T>,
}

impl<T: Entity, S: EntityStore<T>> GuardedRepository<T, S> {
    pub fn new(
        store: S,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditLogger>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            access: Some(access),
            audit: Some(audit),
            resource_name: resource_name.into(),
            _entity: PhantomData,
        }
    }

    /// A repository with no access control and no audit trail.
    ///
    /// Used by internal jobs such as seeding, which run outside any request.
    pub fn unguarded(store: S, resource_name: impl Into<String>) -> Self {
        Self {
            store,
            access: None,
            audit: None,
            resource_name: resource_name.into(),
            _entity: PhantomData,
        }
    }

    pub fn create(&self, ctx: &AuthContext, entity: &T, user_id: Uuid) -> WardenResult<()> {
        self.validate_access(ctx, user_id, action::CREATE)?;

        self.store.insert(entity).inspect_err(|e| {
            error!(resource = %self.resource_name, error = %e, "store create failed");
        })?;

        self.audit_log(ctx, user_id, action::CREATE, Some(entity.id()))
    }

    pub fn get(&self, ctx: &AuthContext, id: Uuid, user_id: Uuid) -> WardenResult<T> {
        self.validate_access(ctx, user_id, action::READ)?;

        let entity = self
            .store
            .find(id)
            .inspect_err(|e| {
                error!(resource = %self.resource_name, error = %e, "store read failed");
            })?
            .ok_or_else(|| WardenError::NotFound {
                entity: self.resource_name.clone(),
                id: id.to_string(),
            })?;

        if let Err(e) = self.audit_log(ctx, user_id, action::READ, Some(id)) {
            warn!(resource = %self.resource_name, error = %e, "failed to audit read");
        }

        Ok(entity)
    }

    pub fn update(&self, ctx: &AuthContext, entity: &T, user_id: Uuid) -> WardenResult<()> {
        self.validate_access(ctx, user_id, action::UPDATE)?;

        self.store.save(entity).inspect_err(|e| {
            error!(resource = %self.resource_name, error = %e, "store update failed");
        })?;

        self.audit_log(ctx, user_id, action::UPDATE, Some(entity.id()))
    }

    pub fn delete(&self, ctx: &AuthContext, id: Uuid, user_id: Uuid) -> WardenResult<()> {
        self.validate_access(ctx, user_id, action::DELETE)?;

        self.store.remove(id).inspect_err(|e| {
            error!(resource = %self.resource_name, error = %e, "store delete failed");
        })?;

        self.audit_log(ctx, user_id, action::DELETE, Some(id))
    }

    pub fn list(&self, ctx: &AuthContext, page: Page, user_id: Uuid) -> WardenResult<Vec<T>> {
        self.validate_access(ctx, user_id, action::LIST)?;

        let entities = self.store.list(page.limit, page.offset).inspect_err(|e| {
            error!(resource = %self.resource_name, error = %e, "store list failed");
        })?;

        if let Err(e) = self.audit_log(ctx, user_id, action::LIST, None) {
            warn!(resource = %self.resource_name, error = %e, "failed to audit list");
        }

        Ok(entities)
    }

    /// Ask `AccessControl` whether the caller may perform `action` here.
    ///
    /// Always passes on an unguarded repository.
    pub fn validate_access(&self, ctx: &AuthContext, user_id: Uuid, action: &str) -> WardenResult<()> {
        let Some(access) = &self.access else {
            return Ok(());
        };
        let token = resource_token(&self.resource_name, action);
        debug!(resource = %token, action = %action, user_id = %user_id, "validating access");
        access.check_permission(ctx, user_id, &token, action)
    }

    fn audit_log(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        action: &str,
        entity_id: Option<Uuid>,
    ) -> WardenResult<()> {
        let Some(audit) = &self.audit else {
            return Ok(());
        };
        let mut event = AccessEvent::new(user_id, action, resource_token(&self.resource_name, action))
            .ip_address(ctx.client_ip.clone());
        if let Some(id) = entity_id {
            event = event.entity(id);
        }
        audit.log_access(&event)
    }
}
