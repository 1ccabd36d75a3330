//! Error kinds shared across the activity engine and its callers.
//!
//! These are *kinds*, not a single catch-all type name: the HTTP collaborator
//! (out of scope) is expected to match on the variant to decide whether to
//! retry, surface a 4xx, or absorb the error silently (e.g. `NotFound` on
//! `Undo`).

use thiserror::Error;

/// Canonical error enumeration produced by the activity engine, the proof
/// coordinator, and the reference store.
///
/// Mirrors `toka_kernel::KernelError`'s shape: one `thiserror` enum per
/// crate-level concern, each variant carrying enough string context to be
/// logged without needing a backtrace.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The activity or message failed structural/semantic validation.
    /// Reported to the caller; never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A unique-key constraint or anchor-event dedupe triggered. Distinct
    /// from other errors so Announce-collection processing can continue
    /// past it (see `spec.md` §7).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The target activity or reference was absent. Sometimes silently
    /// absorbed by the caller (e.g. `Undo` of something not present).
    #[error("not found: {0}")]
    NotFound(String),

    /// A storage or network hiccup. The caller (HTTP collaborator) may
    /// retry the whole activity.
    #[error("transient error: {0}")]
    Transient(String),

    /// A witness policy or follower-authorization check returned false.
    /// Always surfaced to the caller, never retried.
    #[error("policy denied: {0}")]
    PolicyDenied(String),

    /// The activity type or object type is not recognized by this node.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl EngineError {
    /// True for errors the HTTP collaborator is expected to retry the whole
    /// activity for.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    /// True for the anchor-event dedupe / unique-key sentinel.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, EngineError::Duplicate(_))
    }

    /// True for an absent target that some callers treat as a no-op.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}
