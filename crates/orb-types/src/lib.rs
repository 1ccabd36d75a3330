#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-types** – Shared primitive data structures for the orb federation node.
//!
//! The crate is dependency-light and sits at the bottom of the crate graph so
//! that every other crate (store, bus, witness, engine, monitor) can depend on
//! it without causing cycles. It intentionally makes no assumptions about I/O,
//! cryptography, or storage backends – those live in sibling crates.

use serde::{Deserialize, Serialize};

//─────────────────────────────
//  Size limits
//─────────────────────────────

/// Maximum number of `to` recipients on a single activity.
pub const MAX_ACTIVITY_RECIPIENTS: usize = 256;

/// Maximum number of canonical URLs carried by one anchor event.
pub const MAX_ANCHOR_URLS: usize = 16;

/// Maximum number of items in a single Announce collection.
pub const MAX_ANNOUNCE_COLLECTION_LEN: usize = 1024;

//─────────────────────────────
//  IRI newtype
//─────────────────────────────

/// A federation identifier: actor id, activity id, target, or object IRI.
///
/// Modeled as a transparent newtype (mirroring `toka_types::EntityId`) rather
/// than a bare `String` so that "an IRI" is a distinct type from free-form
/// text at every call site, and so that `Reference` triples can't
/// accidentally compare an IRI against a description field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(pub String);

impl Iri {
    /// Borrow the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Iri(s.to_string())
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Iri(s)
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The well-known sentinel IRI that is the only legal `target` for
/// witness-scoped activities (Offer, Invite-witness).
pub const ANCHOR_WITNESS_TARGET: &str = "https://w3id.org/orb#AnchorWitnessTarget";

/// The public sentinel audience IRI used alongside `followers` on Announce.
pub const PUBLIC_SENTINEL: &str = "https://www.w3.org/ns/activitystreams#Public";

//─────────────────────────────
//  Submodules
//─────────────────────────────

/// Activity, activity-type set, and the `ObjectProperty` tagged union.
pub mod activity;
/// `AnchorEvent` and anchor status tracking.
pub mod anchor;
/// Federated `Actor`.
pub mod actor;
/// `Reference` triples and their closed kind enumeration.
pub mod reference;
/// Witness proofs and witness kinds.
pub mod witness;
/// Transparency-log vocabulary: `Sth`, `LogEntry`, `LogMonitorRecord`.
pub mod log;
/// Error kinds shared across the core.
pub mod error;

pub use activity::{Activity, ActivityType, ObjectProperty};
pub use anchor::{AnchorEvent, AnchorStatus, AnchorStatusRecord};
pub use actor::Actor;
pub use error::EngineError;
pub use log::{LogEntry, LogEntryStatus, LogMonitorRecord, Sth};
pub use reference::{Reference, ReferenceKind};
pub use witness::{WitnessKind, WitnessProof};

/// Convenience re-export of the most commonly used types.
pub mod prelude {
    pub use super::{
        activity::{Activity, ActivityType, ObjectProperty},
        anchor::{AnchorEvent, AnchorStatus, AnchorStatusRecord},
        actor::Actor,
        error::EngineError,
        log::{LogEntry, LogEntryStatus, LogMonitorRecord, Sth},
        reference::{Reference, ReferenceKind},
        witness::{WitnessKind, WitnessProof},
        Iri, ANCHOR_WITNESS_TARGET, PUBLIC_SENTINEL,
    };
}
