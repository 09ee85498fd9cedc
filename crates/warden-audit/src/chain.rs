//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. log name as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the access event

use sha2::{Digest, Sha256};

use warden_contracts::{
    audit::AccessEvent,
    error::{WardenError, WardenResult},
};

use crate::event::ChainedEvent;

/// Compute the SHA-256 hash for one access event at `sequence` in `log`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_event(
    log: &str,
    sequence: u64,
    event: &AccessEvent,
    prev_hash: &str,
) -> WardenResult<String> {
    let event_json = serde_json::to_vec(event).map_err(|e| WardenError::AuditWriteFailed {
        reason: format!("failed to encode access event {}: {e}", event.id),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(log.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Valid when every entry's `prev_hash` equals the previous entry's
/// `this_hash` (or `GENESIS_HASH` for the first) and every `this_hash`
/// matches the value recomputed from the entry. An empty chain is valid.
pub fn verify_chain(entries: &[ChainedEvent]) -> bool {
    let mut expected_prev = ChainedEvent::GENESIS_HASH.to_string();

    for entry in entries {
        if entry.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&entry.log, entry.sequence, &entry.event, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}
