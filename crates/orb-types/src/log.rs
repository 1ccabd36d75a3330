//! Transparency-log vocabulary: `Sth`, `LogEntry`, `LogMonitorRecord`.

use serde::{Deserialize, Serialize};

/// A signed tree head: the cryptographic commitment of a transparency log at
/// a point in time. Immutable once received (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sth {
    /// Number of leaves in the tree at this point.
    pub tree_size: u64,
    /// Timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// SHA-256 root hash of the tree.
    pub root_hash: [u8; 32],
    /// Signature over the canonical `TreeHeadSignature{v1, timestamp,
    /// treeSize, rootHash}` structure.
    pub signature: Vec<u8>,
}

impl Sth {
    /// True if `self` and `other` describe the same tree state (size and
    /// root both match) - the no-op branch of the per-tick procedure
    /// (spec.md §4.3 branch B).
    pub fn same_tree_state(&self, other: &Sth) -> bool {
        self.tree_size == other.tree_size && self.root_hash == other.root_hash
    }
}

/// Status of a single log entry.
///
/// Flipped to `Failed` when a recovery walk determines the locally-stored
/// leaf diverges from the authoritative remote leaf at or after some index
/// (spec.md Invariant 5); entries are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryStatus {
    /// The stored leaf is believed consistent with the remote log.
    Ok,
    /// The stored leaf has been superseded by a recovery walk.
    Failed,
}

/// One append-only log entry: `(log URL, index, leaf input bytes, status)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The log this entry belongs to.
    pub log_url: String,
    /// Zero-based index within the log. Indices for a given log URL are
    /// contiguous from zero upward (spec.md Invariant 4); a gap indicates a
    /// monitoring failure to investigate.
    pub index: u64,
    /// Raw leaf input bytes as fetched from the log.
    pub leaf_input: Vec<u8>,
    /// Current status.
    pub status: LogEntryStatus,
}

/// Per-log monitoring state: last-seen STH and public key, updated after
/// each successful monitoring round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMonitorRecord {
    /// The log's base URL.
    pub log_url: String,
    /// Whether this log is actively monitored.
    pub active: bool,
    /// Last-seen signed tree head, if any round has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sth: Option<Sth>,
    /// Last-seen public key, base64-encoded as fetched via webfinger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

impl LogMonitorRecord {
    /// Construct a freshly-enabled monitor record with no prior state.
    pub fn new(log_url: impl Into<String>) -> Self {
        Self { log_url: log_url.into(), active: true, sth: None, pub_key: None }
    }
}
