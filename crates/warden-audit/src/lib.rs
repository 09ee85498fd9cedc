//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained access log for the Warden
//! authorization core.
//!
//! ## Overview
//!
//! Every data access a guarded repository performs is wrapped in a
//! `ChainedEvent` that links to the previous entry via its SHA-256 hash.
//! Changing any stored entry breaks the chain, which `verify_chain` detects.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_audit::InMemoryAuditLog;
//! use warden_core::traits::AuditLogger;
//!
//! let log = InMemoryAuditLog::new("api");
//! log.log_access(&AccessEvent::new(user_id, "read", "product:read"))?;
//!
//! assert!(log.verify_integrity()?);
//! let export = log.export_log()?;
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{AuditExport, ChainedEvent};
pub use memory::InMemoryAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use warden_contracts::audit::AccessEvent;
    use warden_core::traits::AuditLogger;

    use super::{ChainedEvent, InMemoryAuditLog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn event(user_id: Uuid, action: &str) -> AccessEvent {
        AccessEvent::new(user_id, action, format!("product:{action}"))
            .entity(Uuid::new_v4())
            .ip_address(Some("10.0.0.7".to_string()))
    }

    fn log_with(actions: &[&str]) -> (Uuid, InMemoryAuditLog) {
        let user = Uuid::new_v4();
        let log = InMemoryAuditLog::new("test-log");
        for action in actions {
            log.log_access(&event(user, action)).unwrap();
        }
        (user, log)
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// Writing three events and verifying produces a valid chain.
    #[test]
    fn test_hash_chain_integrity() {
        let (_, log) = log_with(&["create", "read", "update"]);
        assert!(log.verify_integrity().unwrap(), "chain must be valid after sequential writes");
    }

    /// Mutating a stored event breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let (_, log) = log_with(&["create", "read", "delete"]);

        {
            let mut state = log.state.lock().unwrap();
            state.entries[0].event.resource = "user:delete".to_string();
        }

        assert!(
            !log.verify_integrity().unwrap(),
            "chain must detect tampering with a stored event"
        );
    }

    /// Reordering entries breaks prev-hash linkage.
    #[test]
    fn test_reorder_detection() {
        let (_, log) = log_with(&["create", "read"]);
        {
            let mut state = log.state.lock().unwrap();
            state.entries.swap(0, 1);
        }
        assert!(!log.verify_integrity().unwrap());
    }

    /// The first entry's `prev_hash` must equal `ChainedEvent::GENESIS_HASH`.
    #[test]
    fn test_genesis_hash() {
        let (_, log) = log_with(&["list"]);
        let export = log.export_log().unwrap();
        assert_eq!(export.entries.len(), 1);
        assert_eq!(export.entries[0].prev_hash, ChainedEvent::GENESIS_HASH);
    }

    /// Sequence numbers must be 0, 1, 2, … with no gaps.
    #[test]
    fn test_sequence_monotonic() {
        let (_, log) = log_with(&["create", "read", "update", "delete"]);
        let export = log.export_log().unwrap();
        for (idx, entry) in export.entries.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64);
        }
    }

    /// `export_log()` contains every event in order, with the terminal hash.
    #[test]
    fn test_export_log() {
        let (user, log) = log_with(&["create", "read", "update"]);
        let export = log.export_log().unwrap();

        assert_eq!(export.log, "test-log");
        assert_eq!(export.entries.len(), 3);
        assert_eq!(export.entries[2].event.action, "update");
        assert_eq!(export.entries[2].event.user_id, user);
        assert_eq!(export.entries[0].event.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(
            export.terminal_hash,
            export.entries.last().unwrap().this_hash
        );
        assert!(super::verify_chain(&export.entries));
    }

    #[test]
    fn test_verify_empty() {
        let log = InMemoryAuditLog::new("empty");
        assert!(log.verify_integrity().unwrap());
        assert!(log.is_empty().unwrap());
        assert_eq!(log.export_log().unwrap().terminal_hash, "");
        assert!(super::verify_chain(&[]));
    }

    /// Identical events in different logs hash differently.
    #[test]
    fn test_log_name_is_part_of_hash() {
        let e = event(Uuid::new_v4(), "read");
        let a = super::hash_event("a", 0, &e, ChainedEvent::GENESIS_HASH).unwrap();
        let b = super::hash_event("b", 0, &e, ChainedEvent::GENESIS_HASH).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_events_for_user() {
        let (user, log) = log_with(&["create", "read"]);
        log.log_access(&event(Uuid::new_v4(), "list")).unwrap();

        let mine = log.events_for_user(user).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(log.len().unwrap(), 3);
    }

    /// Concurrent writers still produce one intact chain.
    #[test]
    fn test_concurrent_writers() {
        let log = Arc::new(InMemoryAuditLog::new("shared"));
        std::thread::scope(|s| {
            for _ in 0..4 {
                let log = Arc::clone(&log);
                s.spawn(move || {
                    let user = Uuid::new_v4();
                    for _ in 0..25 {
                        log.log_access(&event(user, "read")).unwrap();
                    }
                });
            }
        });
        assert_eq!(log.len().unwrap(), 100);
        assert!(log.verify_integrity().unwrap());
    }
}
