//! Route guards: the checks an HTTP layer runs before a handler.
//!
//! Each protected route maps to one `RouteAccess`. Routes addressing a
//! single entity (`/products/{id}`) carry `requires_id` and are checked with
//! the path id so ownership conditions can apply.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    request::AuthContext,
    role::{action, Role},
};
use warden_core::traits::AccessControl;

/// The permission one route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteAccess {
    /// Resource token, e.g. `"product:update"`.
    pub resource: &'static str,
    pub action: &'static str,
    /// Checked against the path id with `check_resource_permission`.
    pub requires_id: bool,
}

impl RouteAccess {
    pub const USER_CREATE: RouteAccess = RouteAccess::collection("user:create", action::CREATE);
    pub const USER_READ: RouteAccess = RouteAccess::instance("user:read", action::READ);
    pub const USER_UPDATE: RouteAccess = RouteAccess::instance("user:update", action::UPDATE);
    pub const USER_DELETE: RouteAccess = RouteAccess::instance("user:delete", action::DELETE);
    pub const USER_LIST: RouteAccess = RouteAccess::collection("user:list", action::LIST);

    pub const PRODUCT_CREATE: RouteAccess = RouteAccess::collection("product:create", action::CREATE);
    pub const PRODUCT_READ: RouteAccess = RouteAccess::instance("product:read", action::READ);
    pub const PRODUCT_UPDATE: RouteAccess = RouteAccess::instance("product:update", action::UPDATE);
    pub const PRODUCT_DELETE: RouteAccess = RouteAccess::instance("product:delete", action::DELETE);
    pub const PRODUCT_LIST: RouteAccess = RouteAccess::collection("product:list", action::LIST);

    pub const ALL: [RouteAccess; 10] = [
        Self::USER_CREATE,
        Self::USER_READ,
        Self::USER_UPDATE,
        Self::USER_DELETE,
        Self::USER_LIST,
        Self::PRODUCT_CREATE,
        Self::PRODUCT_READ,
        Self::PRODUCT_UPDATE,
        Self::PRODUCT_DELETE,
        Self::PRODUCT_LIST,
    ];

    const fn collection(resource: &'static str, action: &'static str) -> Self {
        Self { resource, action, requires_id: false }
    }

    const fn instance(resource: &'static str, action: &'static str) -> Self {
        Self { resource, action, requires_id: true }
    }

    /// Look up the route rule protecting a resource token, e.g. `"product:read"`.
    pub fn find(resource: &str) -> Option<RouteAccess> {
        Self::ALL.into_iter().find(|r| r.resource == resource)
    }
}

/// Runs route-level checks against an `AccessControl`.
pub struct RouteGuard {
    access: Arc<dyn AccessControl>,
}

impl RouteGuard {
    pub fn new(access: Arc<dyn AccessControl>) -> Self {
        Self { access }
    }

    /// Check `route` for the authenticated caller.
    ///
    /// `path_id` is the `{id}` segment of the request path; it is only
    /// consulted for routes with `requires_id`.
    pub fn authorize(&self, ctx: &AuthContext, route: RouteAccess, path_id: Option<&str>) -> WardenResult<()> {
        let user_id = require_user(ctx)?;

        let result = if route.requires_id {
            self.access.check_resource_permission(
                ctx,
                user_id,
                route.resource,
                route.action,
                path_id.unwrap_or_default(),
            )
        } else {
            self.access.check_permission(ctx, user_id, route.resource, route.action)
        };

        result.inspect_err(|e| {
            warn!(user_id = %user_id, resource = %route.resource, error = %e, "route access refused");
        })
    }

    /// The caller must hold exactly `required`.
    pub fn require_role(&self, ctx: &AuthContext, required: &str) -> WardenResult<()> {
        require_user(ctx)?;
        let role = ctx.role().ok_or(WardenError::RoleMissing)?;
        if role == required {
            return Ok(());
        }
        Err(WardenError::PermissionDenied {
            role: role.to_string(),
            resource: format!("role:{required}"),
            action: "access".to_string(),
            reason: format!("role {required} required"),
            user_id: ctx.user_id.map(|id| id.to_string()),
        })
    }

    pub fn require_admin(&self, ctx: &AuthContext) -> WardenResult<()> {
        self.require_role(ctx, Role::Admin.as_str())
    }
}

fn require_user(ctx: &AuthContext) -> WardenResult<Uuid> {
    ctx.user_id.ok_or_else(|| WardenError::InvalidRequest {
        reason: "user id not found in context".to_string(),
    })
}
