//! Permission requests, decisions, and the caller's identity context.
//!
//! These types are ephemeral: they are built per inbound request and never
//! persisted. `AuthContext` replaces ambient request-scoped values and is
//! passed explicitly to every authorization call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Context keys the authorization service populates.
pub mod keys {
    pub const USER_ID: &str = "user_id";
    pub const USER_ROLE: &str = "user_role";
    pub const USER_EMAIL: &str = "user_email";
    pub const CLIENT_IP: &str = "client_ip";
    pub const RESOURCE_ID: &str = "resource_id";
    /// Supplied by the caller when the ownership condition must be checked.
    pub const RESOURCE_OWNER_ID: &str = "resource_owner_id";
}

/// Identity of the caller, as established by authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Option<Uuid>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub client_ip: Option<String>,
}

impl AuthContext {
    /// A context carrying only a role, for non-request-scoped checks.
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    pub fn client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// The role, if present and non-empty.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|r| !r.is_empty())
    }

    /// Flatten the identity into the attribute map the engine matches
    /// conditions against.
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        if let Some(user_id) = self.user_id {
            map.insert(keys::USER_ID.to_string(), Value::String(user_id.to_string()));
        }
        if let Some(role) = &self.role {
            map.insert(keys::USER_ROLE.to_string(), Value::String(role.clone()));
        }
        if let Some(email) = &self.email {
            map.insert(keys::USER_EMAIL.to_string(), Value::String(email.clone()));
        }
        if let Some(ip) = &self.client_ip {
            map.insert(keys::CLIENT_IP.to_string(), Value::String(ip.clone()));
        }
        map
    }
}

/// Everything the policy engine needs to make one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub user_id: Uuid,
    pub role: String,
    pub resource: String,
    pub action: String,
    /// The targeted resource instance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl PermissionRequest {
    pub fn new(
        user_id: Uuid,
        role: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
            resource_id: None,
            context: BTreeMap::new(),
        }
    }

    /// Target one resource instance. An empty id is treated as no id.
    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        let id = resource_id.into();
        self.resource_id = (!id.is_empty()).then_some(id);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The targeted resource instance, ignoring empty ids.
    pub fn target_id(&self) -> Option<&str> {
        self.resource_id.as_deref().filter(|id| !id.is_empty())
    }

    /// A request the engine can evaluate: role, resource and action present.
    pub fn is_well_formed(&self) -> bool {
        !self.role.is_empty() && !self.resource.is_empty() && !self.action.is_empty()
    }
}

/// The engine's decision for one `PermissionRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub allowed: bool,
    pub reason: String,
    /// Names of the documents that decided the outcome.
    #[serde(default)]
    pub policies: Vec<String>,
}

impl PermissionResponse {
    pub const INVALID_REQUEST: &'static str = "invalid request";
    pub const NO_POLICIES_FOR_ROLE: &'static str = "no policies found for role";
    pub const DENIED_BY_POLICY: &'static str = "denied by policy";
    pub const ALLOWED_BY_POLICY: &'static str = "allowed by policy";
    pub const NO_MATCHING_POLICY: &'static str = "no matching policy found";

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            policies: Vec::new(),
        }
    }
}

/// An Allow statement flattened for permission-listing APIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}
