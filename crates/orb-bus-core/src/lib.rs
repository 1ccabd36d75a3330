#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-bus-core** – In-process pub/sub for the orb federation node.
//!
//! This crate provides two related but distinct primitives, both grounded on
//! `toka_bus_core::InMemoryBus`'s broadcast-channel wrapper:
//!
//! - [`bus::Bus`] / [`bus::InMemoryBus`] — a topic-keyed publish/subscribe
//!   channel used to decouple the inbound HTTP path from expensive proof
//!   verification (spec.md §4.2, §9): the inbox handler publishes a `proof`
//!   message and returns immediately; a background subscriber does the
//!   actual work.
//! - [`subscriber::SubscriberList`] — the bounded, blocking-backpressure
//!   fan-out list the Activity Engine exposes via its own `Subscribe()`
//!   contract (spec.md §5, §6): every activity the engine successfully
//!   processes is delivered to every subscriber registered before the call
//!   returned.
//!
//! These are kept as two separate abstractions rather than one generic bus
//! because their delivery contracts differ: the proof topic may drop
//! messages under a lagging receiver (`broadcast`'s normal behavior),
//! whereas the activity subscription contract is blocking back-pressure by
//! default (spec.md §5).

use serde::{Deserialize, Serialize};

use orb_types::{witness::WitnessKind, Iri};

/// Topic-keyed publish/subscribe bus.
pub mod bus;
/// Bounded, blocking-backpressure subscriber fan-out list.
pub mod subscriber;

pub use bus::{Bus, BusError, InMemoryBus};
pub use subscriber::SubscriberList;

/// The well-known topic name the proof coordinator subscribes to
/// (spec.md §4.2).
pub const PROOF_TOPIC: &str = "proof";

/// Message published when an Accept-of-Offer is received, decoupling proof
/// verification from the inbound HTTP path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofMessage {
    /// The anchor the proof concerns.
    pub anchor_id: Iri,
    /// The witness actor that produced the proof.
    pub witness: Iri,
    /// The kind of witness.
    pub kind: WitnessKind,
    /// Raw proof bytes extracted from the receipt's attachment.
    pub proof: Vec<u8>,
    /// The issuance date embedded in the verifiable credential, used by the
    /// proof handler's clock-skew check (spec.md §4.2 step 3).
    pub issuance_date: chrono::DateTime<chrono::Utc>,
}
