//! In-memory implementation of `AuditLogger`.
//!
//! `InMemoryAuditLog` keeps every access event in a hash chain behind a
//! `Mutex`, so guarded repositories on many threads can share one log.
//! Use `export_log()` to hand the chain to compliance tooling and
//! `verify_integrity()` to confirm it has not been tampered with in memory.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use warden_contracts::{
    audit::AccessEvent,
    error::{WardenError, WardenResult},
};
use warden_core::traits::AuditLogger;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AuditExport, ChainedEvent},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct ChainState {
    pub(crate) entries: Vec<ChainedEvent>,
    pub(crate) sequence: u64,
    pub(crate) last_hash: String,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An append-only access log backed by a SHA-256 hash chain.
pub struct InMemoryAuditLog {
    name: String,
    pub(crate) state: Arc<Mutex<ChainState>>,
}

impl InMemoryAuditLog {
    pub fn new(name: impl Into<String>) -> Self {
        let state = ChainState {
            entries: Vec::new(),
            sequence: 0,
            last_hash: ChainedEvent::GENESIS_HASH.to_string(),
        };
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> WardenResult<MutexGuard<'_, ChainState>> {
        self.state.lock().map_err(|e| WardenError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {e}"),
        })
    }

    /// Snapshot every entry written so far.
    pub fn export_log(&self) -> WardenResult<AuditExport> {
        let state = self.lock()?;
        let terminal_hash = state
            .entries
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        Ok(AuditExport {
            log: self.name.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_hash,
        })
    }

    /// True when the chain's linkage and hashes are intact.
    pub fn verify_integrity(&self) -> WardenResult<bool> {
        Ok(verify_chain(&self.lock()?.entries))
    }

    pub fn len(&self) -> WardenResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> WardenResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Events recorded for one user, oldest first.
    pub fn events_for_user(&self, user_id: Uuid) -> WardenResult<Vec<AccessEvent>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.event.user_id == user_id)
            .map(|e| e.event.clone())
            .collect())
    }
}

// ── AuditLogger impl ──────────────────────────────────────────────────────────

impl AuditLogger for InMemoryAuditLog {
    fn log_access(&self, event: &AccessEvent) -> WardenResult<()> {
        let mut state = self.lock()?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_event(&self.name, sequence, event, &prev_hash)?;

        debug!(
            user_id = %event.user_id,
            action = %event.action,
            resource = %event.resource,
            sequence,
            "access recorded"
        );

        state.entries.push(ChainedEvent {
            sequence,
            log: self.name.clone(),
            event: event.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }
}
