//! In-memory implementation of `PolicyStore`.
//!
//! `InMemoryPolicyStore` keeps `PolicyRecord` rows behind a single `Mutex`,
//! so every create, update, and delete is one transaction: a reader never
//! sees a document whose statements are half replaced. Rows go through the
//! same `PolicyRecord` mapping a durable backend would use, which keeps the
//! typed-to-storage conversion exercised on every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use warden_contracts::{
    error::{WardenError, WardenResult},
    policy::{PolicyDocument, ROLE_PREFIX, WILDCARD},
};
use warden_core::traits::PolicyStore;

use crate::record::PolicyRecord;

/// A `PolicyStore` held entirely in memory, in creation order.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    rows: Mutex<Vec<PolicyRecord>>,
    offline: AtomicBool,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backing database going away. While offline every
    /// operation fails with `WardenError::Store`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents, active or not.
    pub fn len(&self) -> WardenResult<usize> {
        Ok(self.rows()?.len())
    }

    pub fn is_empty(&self) -> WardenResult<bool> {
        Ok(self.len()? == 0)
    }

    fn rows(&self) -> WardenResult<MutexGuard<'_, Vec<PolicyRecord>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(WardenError::store("policy store is offline"));
        }
        self.rows
            .lock()
            .map_err(|e| WardenError::store(format!("policy store lock poisoned: {e}")))
    }

    fn ensure_unique_name(rows: &[PolicyRecord], name: &str, except: Option<&str>) -> WardenResult<()> {
        let taken = rows
            .iter()
            .any(|r| r.name == name && Some(r.id.as_str()) != except);
        if taken {
            return Err(WardenError::Conflict {
                reason: format!("policy named '{name}' already exists"),
            });
        }
        Ok(())
    }

    /// Give every statement a fresh id and point it at `policy_id`.
    fn assign_statements(policy: &PolicyDocument, policy_id: Uuid) -> PolicyDocument {
        let mut doc = policy.clone();
        doc.id = policy_id;
        for statement in &mut doc.statements {
            statement.id = Uuid::new_v4();
            statement.policy_id = policy_id;
        }
        doc
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn create(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
        policy.validate()?;

        let mut rows = self.rows()?;
        Self::ensure_unique_name(&rows, &policy.name, None)?;

        let id = if policy.id.is_nil() { Uuid::new_v4() } else { policy.id };
        if rows.iter().any(|r| r.id == id.to_string()) {
            return Err(WardenError::Conflict {
                reason: format!("policy {id} already exists"),
            });
        }

        let doc = Self::assign_statements(policy, id);
        rows.push(PolicyRecord::from_document(&doc)?);

        info!(policy = %doc.name, statements = doc.statements.len(), "policy created");
        Ok(doc)
    }

    fn get(&self, id: Uuid) -> WardenResult<PolicyDocument> {
        let key = id.to_string();
        self.rows()?
            .iter()
            .find(|r| r.id == key)
            .ok_or_else(|| WardenError::NotFound {
                entity: "policy".to_string(),
                id: key.clone(),
            })?
            .to_document()
    }

    fn get_by_role(&self, role: &str) -> WardenResult<Vec<PolicyDocument>> {
        let role_principal = format!("{ROLE_PREFIX}{role}");
        let docs = self
            .rows()?
            .iter()
            .filter(|r| r.is_active)
            .filter(|r| {
                r.statements
                    .iter()
                    .any(|s| s.principal == role_principal || s.principal == WILDCARD)
            })
            .map(PolicyRecord::to_document)
            .collect::<WardenResult<Vec<_>>>()?;

        debug!(role = %role, documents = docs.len(), "fetched policies for role");
        Ok(docs)
    }

    fn get_active(&self) -> WardenResult<Vec<PolicyDocument>> {
        self.rows()?
            .iter()
            .filter(|r| r.is_active)
            .map(PolicyRecord::to_document)
            .collect()
    }

    fn update(&self, policy: &PolicyDocument) -> WardenResult<PolicyDocument> {
        policy.validate()?;

        let mut rows = self.rows()?;
        let key = policy.id.to_string();
        let index = rows
            .iter()
            .position(|r| r.id == key)
            .ok_or_else(|| WardenError::NotFound {
                entity: "policy".to_string(),
                id: key.clone(),
            })?;
        Self::ensure_unique_name(&rows, &policy.name, Some(&key))?;

        let mut doc = Self::assign_statements(policy, policy.id);
        doc.created_at = rows[index].created_at;
        doc.updated_at = Utc::now();

        // Build the replacement row before touching the table so a mapping
        // failure leaves the old statements in place.
        let record = PolicyRecord::from_document(&doc)?;
        rows[index] = record;

        info!(policy = %doc.name, statements = doc.statements.len(), "policy updated");
        Ok(doc)
    }

    fn delete(&self, id: Uuid) -> WardenResult<()> {
        let mut rows = self.rows()?;
        let key = id.to_string();
        let before = rows.len();
        rows.retain(|r| r.id != key);
        if rows.len() == before {
            return Err(WardenError::NotFound {
                entity: "policy".to_string(),
                id: key,
            });
        }
        info!(policy_id = %id, "policy deleted");
        Ok(())
    }
}
