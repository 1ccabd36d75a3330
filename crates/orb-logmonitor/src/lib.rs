#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-logmonitor** – Transparency-log consistency monitor.
//!
//! Implements the per-tick procedure spec.md §4.3 describes for module (H):
//! for each actively-monitored log, fetch its current signed tree head,
//! verify the signature, and reconcile local state against it by one of
//! four branches - first contact, no change, forward growth (verified via a
//! Merkle consistency proof), or a backward-moving regression (resolved via
//! a recovery walk that locates the first point of divergence).
//!
//! Concurrency across logs follows `toka-orchestration`'s
//! `join_all(spawn_tasks)` fan-out pattern; the tick itself is driven by a
//! pluggable [`orb_transport::Scheduler`], with `orb-node`'s default
//! implementation wrapping `tokio::time::interval` (mirroring
//! `toka-agent-runtime`'s orchestration integration tick loop).

mod merkle;

pub use merkle::{leaf_hash, root_hash, verify_consistency_proof, ConsistencyError};

use std::sync::Arc;

use base64::Engine as _;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use orb_store_core::{LogEntryStore, LogMonitorStore, ReferenceStoreApi, StorageError};
use orb_transport::{Cancellation, LogTransport, NeverCancelled, Scheduler, TransportError};
use orb_types::log::{LogEntry, LogEntryStatus, LogMonitorRecord, Sth};

/// Default ceiling on the tree size of a log seen for the first time before
/// its initial build is deferred rather than attempted in one tick
/// (spec.md §4.3 branch A).
pub const DEFAULT_MAX_TREE_SIZE: u64 = 10_000;
/// Default page size for `GetEntries` batching (spec.md §4.3).
pub const DEFAULT_MAX_GET_ENTRIES_RANGE: u64 = 1_000;
/// Default page size for the recovery walk's backward fetch (spec.md §4.3).
pub const DEFAULT_MAX_RECOVERY_FETCH_SIZE: u64 = 1_000;

/// Errors a single log's per-tick procedure can fail with.
///
/// Its own narrow enum rather than reusing `orb_types::EngineError` or
/// `orb_proof::ProofError`, one error enum per crate-level concern.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A call to the log transport failed.
    #[error("log transport failure: {0}")]
    Transport(String),
    /// A reference-store call failed.
    #[error("storage failure: {0}")]
    Storage(String),
    /// The log's tree size exceeds `maxTreeSize` on first contact; deferred
    /// rather than built in this tick.
    #[error("log exceeds the configured maxTreeSize, deferring")]
    TreeTooLarge,
    /// `STH.signature` failed verification against the fetched public key.
    #[error("STH signature verification failed")]
    SthVerificationFailed,
    /// The Merkle root rebuilt from fetched entries doesn't match `STH.rootHash`.
    #[error("rebuilt merkle root does not match the signed tree head")]
    RootMismatch,
    /// The fetched consistency proof didn't verify against the stored and
    /// current roots.
    #[error("consistency proof invalid: {0}")]
    ConsistencyProofInvalid(ConsistencyError),
}

fn transport_err(err: TransportError) -> MonitorError {
    MonitorError::Transport(err.to_string())
}

fn store_err(err: StorageError) -> MonitorError {
    MonitorError::Storage(err.to_string())
}

/// Tuning knobs for [`LogConsistencyMonitor`], defaulting to spec.md §4.3's
/// literal constants.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// See [`DEFAULT_MAX_TREE_SIZE`].
    pub max_tree_size: u64,
    /// See [`DEFAULT_MAX_GET_ENTRIES_RANGE`].
    pub max_get_entries_range: u64,
    /// See [`DEFAULT_MAX_RECOVERY_FETCH_SIZE`].
    pub max_recovery_fetch_size: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_tree_size: DEFAULT_MAX_TREE_SIZE,
            max_get_entries_range: DEFAULT_MAX_GET_ENTRIES_RANGE,
            max_recovery_fetch_size: DEFAULT_MAX_RECOVERY_FETCH_SIZE,
        }
    }
}

/// Verifies an STH's signature against a fetched public key.
///
/// Crypto-agnostic by design, mirroring `orb_witness::Witness`: the actual
/// signature scheme a given transparency log uses (ECDSA, Ed25519, ...) is
/// an external collaborator concern (spec.md §1), not something this crate
/// picks for its callers.
pub trait SthVerifier: Send + Sync {
    /// True if `sth.signature` verifies over the canonical
    /// `TreeHeadSignature{v1, timestamp, treeSize, rootHash}` encoding under
    /// `pub_key`.
    fn verify(&self, sth: &Sth, pub_key: &[u8]) -> bool;
}

/// A verifier that accepts every STH, for tests and local development where
/// no real log signing key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllSths;

impl SthVerifier for AcceptAllSths {
    fn verify(&self, _sth: &Sth, _pub_key: &[u8]) -> bool {
        true
    }
}

/// Runs the per-log per-tick procedure (spec.md §4.3) and fans it out
/// across every active log.
pub struct LogConsistencyMonitor {
    store: Arc<dyn ReferenceStoreApi>,
    transport: Arc<dyn LogTransport>,
    sth_verifier: Arc<dyn SthVerifier>,
    config: MonitorConfig,
}

impl LogConsistencyMonitor {
    /// Construct a monitor over `store`, fetching log state via `transport`
    /// and verifying STH signatures with `sth_verifier`.
    pub fn new(
        store: Arc<dyn ReferenceStoreApi>,
        transport: Arc<dyn LogTransport>,
        sth_verifier: Arc<dyn SthVerifier>,
        config: MonitorConfig,
    ) -> Self {
        Self { store, transport, sth_verifier, config }
    }

    /// Run one tick across every active log concurrently (spec.md §4.3:
    /// logs are monitored independently of one another). A failure on one
    /// log is logged and returned per-log; it never aborts its siblings.
    pub async fn run_tick(&self) -> Vec<(String, Result<(), MonitorError>)> {
        let logs = match self.store.list_active_logs().await {
            Ok(logs) => logs,
            Err(err) => {
                warn!(error = %err, "failed to list active logs, skipping tick");
                return Vec::new();
            }
        };

        let tasks = logs.into_iter().map(|log_url| async move {
            let result = self.tick_one_log(&log_url).await;
            if let Err(ref err) = result {
                warn!(log = %log_url, error = %err, "log monitoring tick failed");
            }
            (log_url, result)
        });
        join_all(tasks).await
    }

    /// Spawn a long-lived task that runs [`Self::run_tick`] every time
    /// `scheduler` fires (spec.md §2: "a tick driven by a scheduler
    /// collaborator").
    pub fn spawn(self: Arc<Self>, mut scheduler: Box<dyn Scheduler>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                scheduler.tick().await;
                self.run_tick().await;
            }
        })
    }

    #[instrument(skip(self), fields(log = %log_url))]
    async fn tick_one_log(&self, log_url: &str) -> Result<(), MonitorError> {
        let sth = self.transport.get_sth(log_url, &NeverCancelled).await.map_err(transport_err)?;
        let pub_key = self.transport.get_public_key(log_url, &NeverCancelled).await.map_err(transport_err)?;
        if !self.sth_verifier.verify(&sth, &pub_key) {
            return Err(MonitorError::SthVerificationFailed);
        }

        let stored = self.store.get_monitor(log_url).await.map_err(store_err)?.unwrap_or_else(|| LogMonitorRecord::new(log_url));

        match &stored.sth {
            None => self.handle_new_log(log_url, &sth, &pub_key).await,
            Some(stored_sth) if stored_sth.same_tree_state(&sth) => {
                debug!("log unchanged since last tick");
                Ok(())
            }
            Some(stored_sth)
                if sth.tree_size < stored_sth.tree_size
                    || (sth.tree_size == stored_sth.tree_size && sth.root_hash != stored_sth.root_hash) =>
            {
                self.run_recovery_walk(log_url, stored_sth.tree_size, &sth, &pub_key).await
            }
            Some(stored_sth) => self.handle_growth(log_url, stored_sth.clone(), &sth, &pub_key).await,
        }
    }

    /// Branch A: first contact with a log.
    async fn handle_new_log(&self, log_url: &str, sth: &Sth, pub_key: &[u8]) -> Result<(), MonitorError> {
        if sth.tree_size == 0 {
            return self.persist(log_url, sth, pub_key).await;
        }
        if sth.tree_size > self.config.max_tree_size {
            warn!(tree_size = sth.tree_size, max = self.config.max_tree_size, "log exceeds maxTreeSize, deferring");
            return Err(MonitorError::TreeTooLarge);
        }

        let leaves = self.fetch_entries_in_batches(log_url, 0, sth.tree_size - 1).await?;
        let hashes: Vec<[u8; 32]> = leaves.iter().map(|l| leaf_hash(l)).collect();
        if root_hash(&hashes) != sth.root_hash {
            return Err(MonitorError::RootMismatch);
        }

        let entries = to_log_entries(log_url, 0, leaves);
        self.store.store_log_entries(log_url, 0, sth.tree_size - 1, &entries).await.map_err(store_err)?;
        self.persist(log_url, sth, pub_key).await
    }

    /// Branch D: the log grew since the last tick.
    async fn handle_growth(&self, log_url: &str, stored_sth: Sth, sth: &Sth, pub_key: &[u8]) -> Result<(), MonitorError> {
        if stored_sth.tree_size > 0 {
            let proof = self
                .transport
                .get_consistency_proof(log_url, stored_sth.tree_size, sth.tree_size, &NeverCancelled)
                .await
                .map_err(transport_err)?;
            verify_consistency_proof(stored_sth.tree_size, sth.tree_size, &stored_sth.root_hash, &sth.root_hash, &proof)
                .map_err(MonitorError::ConsistencyProofInvalid)?;
        }

        let leaves = self.fetch_entries_in_batches(log_url, stored_sth.tree_size, sth.tree_size - 1).await?;
        let entries = to_log_entries(log_url, stored_sth.tree_size, leaves);
        self.store.store_log_entries(log_url, stored_sth.tree_size, sth.tree_size - 1, &entries).await.map_err(store_err)?;
        self.persist(log_url, sth, pub_key).await
    }

    /// Branch C: the log regressed (shrank, or grew but with a root that no
    /// longer extends the stored one). Walks backward from the overlap
    /// between the old and new tree sizes in `maxRecoveryFetchSize` chunks,
    /// comparing fetched leaves against locally stored ones without
    /// appending, until it finds a chunk that matches entirely - the first
    /// index above that point is the first divergence. Everything from
    /// there on is marked `Failed` and replaced with the authoritative
    /// (remote) leaves collected along the way.
    async fn run_recovery_walk(&self, log_url: &str, old_tree_size: u64, sth: &Sth, pub_key: &[u8]) -> Result<(), MonitorError> {
        warn!(old_tree_size, new_tree_size = sth.tree_size, "log state regressed, running recovery walk");

        let overlap = sth.tree_size.min(old_tree_size);
        let mut cursor_end = overlap;
        let mut first_divergent: Option<u64> = None;
        let mut authoritative: Vec<(u64, Vec<u8>)> = Vec::new();

        while cursor_end > 0 {
            let chunk_size = self.config.max_recovery_fetch_size.min(cursor_end);
            let start = cursor_end - chunk_size;
            let end = cursor_end - 1;

            let remote = self.transport.get_entries(log_url, start, end, &NeverCancelled).await.map_err(transport_err)?;
            let local: Vec<LogEntry> = self
                .store
                .get_log_entries_from(log_url, start)
                .await
                .map_err(store_err)?
                .take_while(|e| e.index <= end)
                .collect();

            let mut chunk_first_divergent = None;
            for (i, remote_leaf) in remote.iter().enumerate() {
                let idx = start + i as u64;
                let matches = local.iter().any(|e| e.index == idx && &e.leaf_input == remote_leaf);
                if !matches {
                    chunk_first_divergent.get_or_insert(idx);
                }
            }

            match chunk_first_divergent {
                Some(idx) => {
                    first_divergent = Some(idx);
                    for (i, leaf) in remote.into_iter().enumerate() {
                        authoritative.push((start + i as u64, leaf));
                    }
                    cursor_end = start;
                }
                None => break,
            }
        }

        let Some(first_divergent) = first_divergent else {
            // The overlapping region is entirely consistent; the regression
            // is confined to indices the new STH no longer claims to hold.
            self.store.fail_log_entries_from(log_url, overlap).await.map_err(store_err)?;
            return self.persist(log_url, sth, pub_key).await;
        };

        self.store.fail_log_entries_from(log_url, first_divergent).await.map_err(store_err)?;
        authoritative.retain(|(idx, _)| *idx >= first_divergent);
        authoritative.sort_by_key(|(idx, _)| *idx);
        if let (Some((first_idx, _)), Some((last_idx, _))) = (authoritative.first(), authoritative.last()) {
            let entries: Vec<LogEntry> = authoritative
                .iter()
                .map(|(idx, leaf)| LogEntry {
                    log_url: log_url.to_string(),
                    index: *idx,
                    leaf_input: leaf.clone(),
                    status: LogEntryStatus::Ok,
                })
                .collect();
            self.store.store_log_entries(log_url, *first_idx, *last_idx, &entries).await.map_err(store_err)?;
        }
        self.persist(log_url, sth, pub_key).await
    }

    async fn fetch_entries_in_batches(&self, log_url: &str, start: u64, end: u64) -> Result<Vec<Vec<u8>>, MonitorError> {
        let mut out = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            let batch_end = (cursor + self.config.max_get_entries_range - 1).min(end);
            let batch = self.transport.get_entries(log_url, cursor, batch_end, &NeverCancelled).await.map_err(transport_err)?;
            out.extend(batch);
            cursor = batch_end + 1;
        }
        Ok(out)
    }

    async fn persist(&self, log_url: &str, sth: &Sth, pub_key: &[u8]) -> Result<(), MonitorError> {
        let record = LogMonitorRecord {
            log_url: log_url.to_string(),
            active: true,
            sth: Some(sth.clone()),
            pub_key: Some(base64::engine::general_purpose::STANDARD.encode(pub_key)),
        };
        self.store.put_monitor(&record).await.map_err(store_err)
    }
}

fn to_log_entries(log_url: &str, start_index: u64, leaves: Vec<Vec<u8>>) -> Vec<LogEntry> {
    leaves
        .into_iter()
        .enumerate()
        .map(|(i, leaf_input)| LogEntry {
            log_url: log_url.to_string(),
            index: start_index + i as u64,
            leaf_input,
            status: LogEntryStatus::Ok,
        })
        .collect()
}
