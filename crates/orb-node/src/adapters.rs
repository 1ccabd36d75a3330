//! Reference collaborator implementations for local development.
//!
//! spec.md §1 scopes the HTTP surface, the CAS protocol, and the concrete
//! transparency-log wire format out of this codebase - they're external
//! collaborators the node binary is expected to inject in production. These
//! adapters are the `EchoWitness`/`NeverCancelled`-style reference doubles
//! that let the node start up and run end-to-end locally without one: they
//! log what they would have done and return a value a caller can act on,
//! the same role `toka-runtime`'s in-memory storage backend plays before a
//! persistent one is wired in.

use async_trait::async_trait;
use tracing::info;

use orb_transport::{log_transport::ConsistencyProof, ActorResolver, Cancellation, LogTransport, Scheduler, TransportError};
use orb_types::{activity::Activity, actor::Actor, log::Sth, Iri};

/// Posts activities nowhere but the log; returns the activity's own id as
/// if delivery succeeded. Signed `GET`s always fail, since there is no
/// remote peer to fetch from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingActivityTransport;

#[async_trait]
impl orb_transport::ActivityTransport for LoggingActivityTransport {
    async fn post(&self, activity: &Activity, exclude: &[Iri], _cancel: &dyn Cancellation) -> Result<Iri, TransportError> {
        info!(activity_id = %activity.id, to = ?activity.to, excluded = exclude.len(), "would deliver activity");
        Ok(activity.id.clone())
    }

    async fn get_signed(&self, iri: &Iri, _cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Fatal(format!("no activity transport configured to fetch {iri}")))
    }
}

/// An `ActorResolver` that always fails. Safe as a default because
/// `ActivityEngine::resolve_actor` only reaches it on a cache miss, and a
/// failed resolution is logged and otherwise ignored by the inbox handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActorResolver;

#[async_trait]
impl ActorResolver for NullActorResolver {
    async fn fetch_actor(&self, iri: &Iri, _cancel: &dyn Cancellation) -> Result<Actor, TransportError> {
        Err(TransportError::Fatal(format!("no actor resolver configured to fetch {iri}")))
    }
}

/// A `LogTransport` that always fails. Safe as a default because the log
/// consistency monitor only ever calls it for logs named in
/// `NodeConfig::log_monitor.active_logs`, which defaults to empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogTransport;

#[async_trait]
impl LogTransport for NullLogTransport {
    async fn get_sth(&self, log_url: &str, _cancel: &dyn Cancellation) -> Result<Sth, TransportError> {
        Err(TransportError::Fatal(format!("no log transport configured for {log_url}")))
    }

    async fn get_public_key(&self, log_url: &str, _cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Fatal(format!("no log transport configured for {log_url}")))
    }

    async fn get_entries(
        &self,
        log_url: &str,
        _start: u64,
        _end: u64,
        _cancel: &dyn Cancellation,
    ) -> Result<Vec<Vec<u8>>, TransportError> {
        Err(TransportError::Fatal(format!("no log transport configured for {log_url}")))
    }

    async fn get_consistency_proof(
        &self,
        log_url: &str,
        _first: u64,
        _second: u64,
        _cancel: &dyn Cancellation,
    ) -> Result<ConsistencyProof, TransportError> {
        Err(TransportError::Fatal(format!("no log transport configured for {log_url}")))
    }
}

/// Drives the log consistency monitor's tick from a `tokio::time::interval`,
/// the default implementation of `orb_transport::Scheduler` (spec.md §2).
pub struct IntervalScheduler {
    interval: tokio::time::Interval,
}

impl IntervalScheduler {
    /// Build a scheduler that fires every `period`, starting after the
    /// first full period has elapsed.
    pub fn new(period: std::time::Duration) -> Self {
        Self { interval: tokio::time::interval(period) }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
