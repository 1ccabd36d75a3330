//! Activity transport: `Post` and signed `GET` (spec.md §6).

use async_trait::async_trait;

use orb_types::{activity::Activity, Iri};

use crate::{Cancellation, TransportError};

/// Outbound activity delivery and signed resource retrieval.
///
/// The outbox handler posts through this trait; the Announce fan-out
/// (spec.md §4.1) passes `exclude` so the original Create's actor doesn't
/// receive a trivial echo of its own anchor event.
#[async_trait]
pub trait ActivityTransport: Send + Sync {
    /// Deliver `activity` to its `to` recipients, excluding any actor IRI
    /// present in `exclude`. Returns the activity id assigned by the
    /// remote inbox (normally just `activity.id` echoed back).
    async fn post(
        &self,
        activity: &Activity,
        exclude: &[Iri],
        cancel: &dyn Cancellation,
    ) -> Result<Iri, TransportError>;

    /// Perform a signed `GET` of a remote resource (an actor document, a
    /// followers collection page, ...), returning the raw response body.
    async fn get_signed(&self, iri: &Iri, cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError>;
}
