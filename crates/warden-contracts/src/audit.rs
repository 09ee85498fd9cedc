//! Access events recorded by the audit logger.
//!
//! The guarded repository writes one `AccessEvent` per data operation. The
//! policy engine never writes audit events; its evaluations go to the
//! application log instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of one data access, kept for compliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub id: Uuid,
    /// The caller who performed the access.
    pub user_id: Uuid,
    /// The CRUD action performed (e.g. "create", "list").
    pub action: String,
    /// The resource token accessed (e.g. "product:create").
    pub resource: String,
    /// The entity touched, when the operation targets a single entity.
    pub entity_id: Option<Uuid>,
    /// Client address, when the request carried one.
    pub ip_address: Option<String>,
    /// Wall-clock time the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    pub fn new(user_id: Uuid, action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action: action.into(),
            resource: resource.into(),
            entity_id: None,
            ip_address: None,
            timestamp: Utc::now(),
        }
    }

    pub fn entity(mut self, entity_id: Uuid) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}
