#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-transport** – External collaborator traits consumed by the orb
//! core.
//!
//! The HTTP surface, the CAS protocol, and the specific wire format used to
//! fetch transparency-log data are all out of scope for this crate
//! (spec.md §1): it only defines the *interfaces* the core depends on,
//! following the same "trait-only, implementation lives elsewhere" split
//! `toka_auth` uses for `TokenValidator`. Every method is `#[async_trait]`
//! and object-safe via `Arc<dyn Trait>` so the node binary can inject a
//! production adapter (or, in tests, an in-memory double) without the core
//! depending on its concrete type.

use async_trait::async_trait;
use thiserror::Error;

use orb_types::{activity::Activity, Iri};

/// Activity transport: posting outbound activities and fetching remote
/// resources over signed GET.
pub mod activity_transport;
/// Content-addressed storage client used to dereference anchor payloads.
pub mod cas;
/// Transparency-log transport: STH, entries, consistency proofs, webfinger.
pub mod log_transport;
/// External periodic-tick trigger for the log consistency monitor.
pub mod scheduler;

pub use activity_transport::ActivityTransport;
pub use cas::CasClient;
pub use log_transport::LogTransport;
pub use scheduler::Scheduler;

/// Errors shared across every collaborator trait in this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote call failed for a reason the caller should treat as
    /// retryable (spec.md §7 `Transient`).
    #[error("transient transport failure: {0}")]
    Transient(String),
    /// The remote call failed for a reason that should not be retried
    /// (e.g. a malformed response, a 4xx).
    #[error("transport failure: {0}")]
    Fatal(String),
    /// The operation was cancelled via its cancellation token before
    /// completing.
    #[error("operation cancelled")]
    Cancelled,
}

/// A minimal cancellation signal passed by reference into every boundary
/// call (spec.md §5: "Every boundary call accepts a cancellation
/// token/context").
///
/// Kept crate-local and trait-agnostic rather than depending on
/// `tokio_util::sync::CancellationToken` directly, so that `orb-transport`
/// doesn't force a specific cancellation crate onto implementors; the node
/// binary's production adapters wrap a real `CancellationToken` behind this
/// trait.
pub trait Cancellation: Send + Sync {
    /// True once cancellation has been requested.
    fn is_cancelled(&self) -> bool;
}

/// A cancellation signal that never fires, for callers (and most tests)
/// that don't need cooperative cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl Cancellation for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Fetch a remote actor document. Shared by `ActivityTransport` and the
/// inbox handler's cache-miss refresh path (spec.md §3 Ownership: "borrowed
/// values - cached in the store but re-fetched on cache miss").
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// Fetch and parse the actor document at `iri`.
    async fn fetch_actor(&self, iri: &Iri, cancel: &dyn Cancellation) -> Result<orb_types::actor::Actor, TransportError>;
}

/// Re-exported so downstream crates can build activities without a second
/// `orb-types` import for this one type.
pub type ActivityRef = Activity;
