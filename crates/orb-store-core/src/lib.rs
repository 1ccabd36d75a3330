#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-store-core** – Reference Store API traits for the orb federation
//! node.
//!
//! This crate defines the storage contract spec.md §6 calls the "Reference
//! Store": activities keyed by id, `(kind, object, target)` reference
//! triples, anchor-index status, witness proofs, and append-only log
//! entries. It provides no concrete implementation - storage drivers (the
//! in-memory driver in `orb-store-memory`, or a persistent KV-backed driver)
//! implement these traits in separate crates, mirroring how `toka-store-core`
//! only defines `StorageBackend` and leaves `toka-store-sled` /
//! `toka-store-memory` to implement it.

use async_trait::async_trait;
use thiserror::Error;

use orb_types::{
    activity::Activity,
    actor::Actor,
    anchor::AnchorStatusRecord,
    log::{LogEntry, LogMonitorRecord},
    reference::{Reference, ReferenceCriteria, ReferenceKind},
    witness::WitnessProof,
    Iri,
};

//─────────────────────────────
//  Error type
//─────────────────────────────

/// Errors that can occur during reference-store operations.
///
/// All backends surface their own failures through this enum so the
/// activity engine can uniformly tag storage hiccups as transient
/// (spec.md §7), mirroring `toka_store_core::StorageError`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested activity, actor, or status row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend failed to serialize or deserialize a stored value.
    #[error("(de)serialization failed: {0}")]
    Codec(String),
    /// The backend itself failed (I/O, connection, etc).
    #[error("backend operation failed: {0}")]
    Backend(String),
}

/// Convenience result alias used throughout the store trait surface.
pub type StoreResult<T> = Result<T, StorageError>;

//─────────────────────────────
//  Query iterator
//─────────────────────────────

/// An owned, already-materialized query result.
///
/// Backed by `Vec<T>::into_iter` rather than a lazy cursor: the Reference
/// Store is assumed to be a persistent KV engine (out of scope per spec.md
/// §1) that performs the filtering itself and hands back a finished batch,
/// matching the iterator/query contract spec.md §6 describes
/// (`QueryActivities(criteria) -> iterator`).
pub struct QueryIter<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T> QueryIter<T> {
    /// Wrap an already-filtered `Vec<T>` as a query result.
    pub fn new(items: Vec<T>) -> Self {
        Self { inner: items.into_iter() }
    }
}

impl<T> Iterator for QueryIter<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }
}

/// Optional filter criteria for `QueryActivities`: `{referenceKind,
/// objectIRI, referenceIRI}`, each independently optional (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct ActivityCriteria {
    /// Restrict to activities linked via this reference kind, if set.
    pub reference_kind: Option<ReferenceKind>,
    /// Restrict to activities whose owning object (inbox/outbox owner) is
    /// this IRI, if set.
    pub object: Option<Iri>,
    /// Restrict to activities referencing this IRI, if set.
    pub reference: Option<Iri>,
}

//─────────────────────────────
//  Activity store
//─────────────────────────────

/// Activities keyed by id, persisted in an owner's inbox or outbox forever.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Persist `activity`. Idempotent by activity id (spec.md §6).
    async fn put(&self, activity: &Activity) -> StoreResult<()>;

    /// Fetch one activity addressed by a reference triple: the activity
    /// owned by `object_iri` (e.g. "our outbox") that is reachable via
    /// `reference_kind` and refers to `activity_iri`.
    async fn get_activity(
        &self,
        reference_kind: ReferenceKind,
        object_iri: &Iri,
        activity_iri: &Iri,
    ) -> StoreResult<Option<Activity>>;

    /// Fetch a single activity by its own id, regardless of which
    /// collection it lives in. Used by the inbox handler's "retrievable by
    /// id from the outbox" check (spec.md §4.1 Validation rules).
    async fn get_by_id(&self, activity_iri: &Iri) -> StoreResult<Option<Activity>>;

    /// Query activities matching `criteria`.
    async fn query_activities(&self, criteria: ActivityCriteria) -> StoreResult<QueryIter<Activity>>;
}

//─────────────────────────────
//  Reference store
//─────────────────────────────

/// `(kind, object, target)` reference triples.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Add a reference triple. Idempotent on the triple (spec.md §6).
    async fn add_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<()>;

    /// Delete a reference triple. Idempotent - deleting an absent triple is
    /// not an error (spec.md §7: `Undo` of something not present).
    async fn delete_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<()>;

    /// True if the exact triple is present.
    async fn has_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<bool>;

    /// Query references matching `criteria` for a given kind.
    async fn query_references(
        &self,
        kind: ReferenceKind,
        criteria: ReferenceCriteria,
    ) -> StoreResult<QueryIter<Reference>>;
}

//─────────────────────────────
//  Actor store
//─────────────────────────────

/// Actors, cached by IRI on first contact and re-fetched on cache miss.
#[async_trait]
pub trait ActorStore: Send + Sync {
    /// Fetch a cached actor.
    async fn get_actor(&self, iri: &Iri) -> StoreResult<Option<Actor>>;

    /// Cache (or overwrite) an actor.
    async fn put_actor(&self, actor: &Actor) -> StoreResult<()>;
}

//─────────────────────────────
//  Anchor status store
//─────────────────────────────

/// Anchor-index status keyed by anchor id.
#[async_trait]
pub trait AnchorStatusStore: Send + Sync {
    /// Insert a new status row. A completed row is never demoted
    /// (spec.md Invariant 3); implementations must reject an attempt to
    /// overwrite a `Completed` row with `InProcess`.
    async fn add_status(&self, record: &AnchorStatusRecord) -> StoreResult<()>;

    /// Fetch the current status row for an anchor.
    async fn get_status(&self, anchor_id: &Iri) -> StoreResult<Option<AnchorStatusRecord>>;
}

//─────────────────────────────
//  Witness-proof store
//─────────────────────────────

/// Witness proofs collected per anchor.
#[async_trait]
pub trait WitnessProofStore: Send + Sync {
    /// Add or fill a proof row. Idempotent on `(anchor_id, witness)`
    /// (spec.md §4.2 step 4): a duplicate `AddProof` from the same witness
    /// is a no-op, not an error.
    async fn add_proof(&self, proof: &WitnessProof) -> StoreResult<()>;

    /// Fetch every proof row collected for an anchor.
    async fn get(&self, anchor_id: &Iri) -> StoreResult<Vec<WitnessProof>>;
}

//─────────────────────────────
//  Log-entry store
//─────────────────────────────

/// Append-only per-log entry storage, consumed by the transparency-log
/// consistency monitor.
#[async_trait]
pub trait LogEntryStore: Send + Sync {
    /// Store a contiguous run of entries `[start, end]` for `log_url`.
    async fn store_log_entries(&self, log_url: &str, start: u64, end: u64, entries: &[LogEntry]) -> StoreResult<()>;

    /// Iterate stored entries for `log_url` starting at `from`, in index
    /// order.
    async fn get_log_entries_from(&self, log_url: &str, from: u64) -> StoreResult<QueryIter<LogEntry>>;

    /// Mark every entry at or after `from` for `log_url` as `Failed`
    /// (spec.md §4.3 recovery walk postcondition). Never deletes entries.
    async fn fail_log_entries_from(&self, log_url: &str, from: u64) -> StoreResult<()>;
}

//─────────────────────────────
//  Log-monitor store
//─────────────────────────────

/// Per-log monitoring state, persisted across ticks.
#[async_trait]
pub trait LogMonitorStore: Send + Sync {
    /// Fetch the monitor record for a log, if one exists.
    async fn get_monitor(&self, log_url: &str) -> StoreResult<Option<LogMonitorRecord>>;

    /// Persist (insert or overwrite) a monitor record.
    async fn put_monitor(&self, record: &LogMonitorRecord) -> StoreResult<()>;

    /// List every log URL currently marked active.
    async fn list_active_logs(&self) -> StoreResult<Vec<String>>;
}

/// The full Reference Store surface the Activity Engine, proof coordinator,
/// and log monitor all depend on. A single backend crate typically
/// implements all six traits over one shared connection/table set, so this
/// supertrait lets callers hold one `Arc<dyn ReferenceStoreApi>` instead of
/// six separate trait objects.
pub trait ReferenceStoreApi:
    ActivityStore + ReferenceStore + ActorStore + AnchorStatusStore + WitnessProofStore + LogEntryStore + LogMonitorStore
{
}

impl<T> ReferenceStoreApi for T where
    T: ActivityStore + ReferenceStore + ActorStore + AnchorStatusStore + WitnessProofStore + LogEntryStore + LogMonitorStore
{
}
