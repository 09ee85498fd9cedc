//! Error types for the Warden authorization core.
//!
//! All fallible operations return `WardenResult<T>`. Each variant carries
//! enough context to produce a diagnostic log line, and maps to an
//! `ErrorCategory` so the HTTP layer can pick a status code without
//! inspecting the variant itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a `WardenError`, mirrored by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    Internal,
    Database,
}

impl ErrorCategory {
    /// The HTTP status code the delivery layer responds with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::Unauthorized => 401,
            ErrorCategory::Forbidden => 403,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Internal | ErrorCategory::Database => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Database => "database",
        }
    }
}

/// The unified error type for the Warden crates.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The permission request was empty or malformed.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The caller's context carries no role to evaluate against.
    #[error("unauthorized: user role not found in context")]
    RoleMissing,

    /// The policy engine evaluated the request and refused it.
    #[error("{}", permission_denied_message(.user_id.as_deref(), .role, .resource, .action, .reason))]
    PermissionDenied {
        role: String,
        resource: String,
        action: String,
        reason: String,
        user_id: Option<String>,
    },

    /// The role is outside the set of roles the system knows about.
    #[error("role not found: {role}")]
    RoleNotFound { role: String },

    /// The policy engine itself failed while evaluating a request.
    #[error("policy evaluation failed: {reason}")]
    PolicyEvaluationFailed { reason: String },

    /// The backing store could not complete an operation.
    #[error("store error: {reason}")]
    Store { reason: String },

    /// A policy document or statement failed validation.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// Serialized context data received from another service could not be decoded.
    #[error("context decode error: {reason}")]
    ContextDecode { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The audit logger could not persist an access event.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },
}

fn permission_denied_message(
    user_id: Option<&str>,
    role: &str,
    resource: &str,
    action: &str,
    reason: &str,
) -> String {
    match user_id {
        Some(user_id) => format!(
            "permission denied: user {user_id} with role {role} cannot {action} on {resource} - {reason}"
        ),
        None => format!("permission denied: role {role} cannot {action} on {resource} - {reason}"),
    }
}

impl WardenError {
    /// Build a `PermissionDenied` error without a user id.
    pub fn permission_denied(
        role: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        WardenError::PermissionDenied {
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
            reason: reason.into(),
            user_id: None,
        }
    }

    /// Build a `Store` error from any displayable cause.
    pub fn store(cause: impl std::fmt::Display) -> Self {
        WardenError::Store { reason: cause.to_string() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WardenError::InvalidRequest { .. }
            | WardenError::RoleNotFound { .. }
            | WardenError::InvalidPolicy { .. }
            | WardenError::ContextDecode { .. } => ErrorCategory::Validation,
            WardenError::RoleMissing => ErrorCategory::Unauthorized,
            WardenError::PermissionDenied { .. } => ErrorCategory::Forbidden,
            WardenError::NotFound { .. } => ErrorCategory::NotFound,
            WardenError::Conflict { .. } => ErrorCategory::Conflict,
            WardenError::PolicyEvaluationFailed { .. }
            | WardenError::ConfigError { .. }
            | WardenError::AuditWriteFailed { .. } => ErrorCategory::Internal,
            WardenError::Store { .. } => ErrorCategory::Database,
        }
    }

    /// Shorthand for `self.category().status_code()`.
    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// True when access was legitimately refused, as opposed to the
    /// authorization subsystem being broken.
    pub fn is_denial(&self) -> bool {
        matches!(self, WardenError::PermissionDenied { .. })
    }
}

/// Convenience alias used throughout the Warden crates.
pub type WardenResult<T> = Result<T, WardenError>;
