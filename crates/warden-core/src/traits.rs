//! Core trait definitions for the Warden authorization pipeline.
//!
//! These traits define the seams between the authorization core and its
//! collaborators:
//!
//! - `PolicyStore`: durable storage for policy documents
//! - `PolicyEngine`: evaluates permission requests against policies
//! - `AccessControl`: the check consumed by repositories and route guards
//! - `AuditLogger`: compliance sink for data-access events
//! - `EntityStore`: the generic CRUD persistence a repository wraps
//!
//! All of them are synchronous and `Send + Sync` so a single instance can be
//! shared across request-handling threads behind an `Arc`.

use uuid::Uuid;

use warden_contracts::{
    audit::AccessEvent,
    error::WardenResult,
    policy::PolicyDocument,
    request::{AuthContext, PermissionRequest, PermissionResponse},
};

/// Durable storage for policy documents and their statements.
///
/// Implementations must replace a document's statements atomically on
/// `update` and delete them together with the document on `delete`.
pub trait PolicyStore: Send + Sync {
    /// Persist a new document and its statements.
    ///
    /// Returns the stored document with store-assigned statement ids.
    fn create(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument>;

    /// Fetch one document by id, active or not.
    fn get(&self, id: Uuid) -> WardenResult<PolicyDocument>;

    /// Active documents with at least one statement whose principal is
    /// `role:<role>` or `*`. Each document appears once.
    fn get_by_role(&self, role: &str) -> WardenResult<Vec<PolicyDocument>>;

    /// Every active document.
    fn get_active(&self) -> WardenResult<Vec<PolicyDocument>>;

    /// Overwrite a document and replace its full statement set.
    fn update(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument>;

    /// Delete a document and all of its statements.
    fn delete(&self, id: Uuid) -> WardenResult<()>;
}

/// The policy engine: decides one permission request at a time.
///
/// Evaluation must be fast and side-effect free apart from logging.
pub trait PolicyEngine: Send + Sync {
    /// Evaluate `request` against the current policy set.
    ///
    /// A well-formed request always yields `Ok`. An absent policy is an
    /// explicit deny, not an error.
    fn evaluate(&self, request: &PermissionRequest) -> WardenResult<PermissionResponse>;

    /// Active documents that apply to `role`, read directly from the store.
    fn policies_for_role(&self, role: &str) -> WardenResult<Vec<PolicyDocument>>;
}

/// The access check repositories and route guards call before acting.
pub trait AccessControl: Send + Sync {
    /// `Ok(())` if the caller described by `ctx` may perform `action` on `resource`.
    fn check_permission(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> WardenResult<()>;

    /// Like `check_permission`, scoped to one resource instance.
    fn check_resource_permission(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        resource: &str,
        action: &str,
        resource_id: &str,
    ) -> WardenResult<()>;
}

/// The audit logger: append-only record of data access.
pub trait AuditLogger: Send + Sync {
    /// Record one access event.
    fn log_access(&self, event: &AccessEvent) -> WardenResult<()>;
}

/// Anything a guarded repository can store.
pub trait Entity: Clone + Send + Sync {
    fn id(&self) -> Uuid;
}

/// The generic persistence a `GuardedRepository` wraps.
///
/// Implementations perform no access checks of their own.
pub trait EntityStore<T: Entity>: Send + Sync {
    fn insert(&self, entity: &T) -> WardenResult<()>;

    /// `Ok(None)` when no entity has this id.
    fn find(&self, id: Uuid) -> WardenResult<Option<T>>;

    /// Overwrite an existing entity. Unknown ids yield `NotFound`.
    fn save(&self, entity: &T) -> WardenResult<()>;

    fn remove(&self, id: Uuid) -> WardenResult<()>;

    fn list(&self, limit: usize, offset: usize) -> WardenResult<Vec<T>>;
}
