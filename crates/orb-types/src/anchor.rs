//! `AnchorEvent` and anchor status tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Iri;

/// A cryptographically-addressed commitment to a batch of DID operations,
/// carried as the payload of a Create activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorEvent {
    /// One or more URLs; the first element is the canonical anchor
    /// reference (spec.md §6).
    pub urls: Vec<Iri>,
    /// Optional embedded payload (the anchor-linkset content object).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Authoring actor.
    pub author: Iri,
    /// Parent anchor references, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Iri>,
}

impl AnchorEvent {
    /// The canonical URL for this anchor event (the first of `urls`), if
    /// present. `AnchorEvent`s with an empty `urls` list are never valid
    /// and fail validation before reaching any reference-store call.
    pub fn canonical_url(&self) -> Option<&Iri> {
        self.urls.first()
    }

    /// True if the `urls` list exceeds the configured bound.
    pub fn urls_within_bounds(&self) -> bool {
        self.urls.len() <= crate::MAX_ANCHOR_URLS
    }
}

/// Status of an anchor as tracked by the witness/proof coordinator.
///
/// Once `Completed`, never demoted back to `InProcess` (spec.md Invariant 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorStatus {
    /// Offers have been sent; not all required proofs are in yet.
    InProcess,
    /// The witness policy has been satisfied.
    Completed,
}

/// A status row keyed by anchor id, with an expiry used for TTL-based
/// garbage collection of stale `in-process` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorStatusRecord {
    /// The anchor id this record tracks.
    pub anchor_id: Iri,
    /// Current status.
    pub status: AnchorStatus,
    /// Expiry after which an `in-process` record may be garbage collected.
    pub expires_at: DateTime<Utc>,
}

impl AnchorStatusRecord {
    /// Construct a new `in-process` record with the given TTL from now.
    pub fn new_in_process(anchor_id: Iri, ttl: chrono::Duration) -> Self {
        Self {
            anchor_id,
            status: AnchorStatus::InProcess,
            expires_at: Utc::now() + ttl,
        }
    }

    /// True if this record has passed its expiry and is eligible for GC.
    ///
    /// `Completed` records are never reaped by this check alone - callers
    /// must additionally confirm a retention policy, since spec.md
    /// Invariant 3 only prohibits demotion, not eventual cleanup, but the
    /// core itself GCs only `InProcess` rows left behind by abandoned
    /// offers.
    pub fn is_expired_in_process(&self, now: DateTime<Utc>) -> bool {
        self.status == AnchorStatus::InProcess && now >= self.expires_at
    }

    /// Attempt to promote this record to `Completed`. No-op (returns
    /// `false`) if already completed, enforcing Invariant 3 at the type
    /// level rather than relying on every caller to check first.
    pub fn try_complete(&mut self) -> bool {
        if self.status == AnchorStatus::Completed {
            return false;
        }
        self.status = AnchorStatus::Completed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_url_is_first_element() {
        let ev = AnchorEvent {
            urls: vec![Iri::from("https://a"), Iri::from("https://b")],
            payload: None,
            author: Iri::from("https://author"),
            parents: vec![],
        };
        assert_eq!(ev.canonical_url().unwrap().as_str(), "https://a");
    }

    #[test]
    fn completed_status_never_demoted() {
        let mut record = AnchorStatusRecord::new_in_process(Iri::from("a"), chrono::Duration::hours(1));
        assert!(record.try_complete());
        assert_eq!(record.status, AnchorStatus::Completed);
        // Second call is a no-op; status stays Completed.
        assert!(!record.try_complete());
        assert_eq!(record.status, AnchorStatus::Completed);
    }
}
