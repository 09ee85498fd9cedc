//! Chain entry and exported log types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_contracts::audit::AccessEvent;

/// One access event sealed into the hash chain.
///
/// Modifying any field, including those of the wrapped `event`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// Name of the log this entry belongs to.
    pub log: String,

    pub event: AccessEvent,

    /// Hash of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash over (log, sequence, prev_hash, event JSON).
    pub this_hash: String,
}

impl ChainedEvent {
    /// `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of an audit log, as handed to compliance tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    pub log: String,

    /// All entries in chain order.
    pub entries: Vec<ChainedEvent>,

    pub exported_at: DateTime<Utc>,

    /// `this_hash` of the last entry. Empty when the log is empty.
    pub terminal_hash: String,
}
