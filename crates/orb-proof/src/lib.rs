#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-proof** – Witness/Proof coordination subscriber for the orb
//! federation node.
//!
//! This crate implements the pub/sub-backed half of the Offer/
//! Accept-of-Offer exchange (spec.md §4.2): a long-lived task subscribes to
//! `orb_bus_core::Bus`'s `proof` topic and runs the six-step procedure on
//! every message, decoupling expensive proof verification from the inbound
//! HTTP path that published it. Spawned once at node startup, mirroring
//! `toka-orchestration::start_orchestration`'s spawn-a-long-lived-task
//! pattern rather than polling from the request path.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use orb_bus_core::{Bus, ProofMessage, PROOF_TOPIC};
use orb_store_core::{AnchorStatusStore, WitnessProofStore};
use orb_witness::WitnessPolicy;

/// Errors produced while processing one proof message.
///
/// Kept as its own narrow enum rather than reusing `orb_types::EngineError`,
/// one error enum per crate-level concern (`BusError`, `StorageError`, and
/// `KernelError` are all distinct types too).
#[derive(Debug, Error)]
pub enum ProofError {
    /// Step 1: the anchor the message concerns does not exist.
    #[error("anchor not found: {0}")]
    AnchorNotFound(String),
    /// Step 3: the proof's issuance date falls outside the configured
    /// clock-skew window.
    #[error("proof issuance date outside the allowed clock-skew window")]
    ClockSkewExceeded,
    /// A reference-store call failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

fn store_err(err: orb_store_core::StorageError) -> ProofError {
    ProofError::Storage(err.to_string())
}

/// Default clock-skew tolerance: ten years (spec.md §4.2).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::days(3650);

/// Tunable proof-coordinator configuration.
#[derive(Debug, Clone)]
pub struct ProofCoordinatorConfig {
    /// Maximum allowed distance between "now" and a proof's issuance date.
    pub clock_skew: Duration,
}

impl Default for ProofCoordinatorConfig {
    fn default() -> Self {
        Self { clock_skew: DEFAULT_CLOCK_SKEW }
    }
}

/// Runs the six-step witness/proof procedure against a reference store.
pub struct ProofCoordinator {
    store: Arc<dyn orb_store_core::ReferenceStoreApi>,
    policy: Arc<dyn WitnessPolicy>,
    config: ProofCoordinatorConfig,
}

impl ProofCoordinator {
    /// Construct a new coordinator over `store`, deciding completion with
    /// `policy`.
    pub fn new(
        store: Arc<dyn orb_store_core::ReferenceStoreApi>,
        policy: Arc<dyn WitnessPolicy>,
        config: ProofCoordinatorConfig,
    ) -> Self {
        Self { store, policy, config }
    }

    /// Run the six-step procedure (spec.md §4.2) for one message.
    #[instrument(skip(self, message), fields(anchor_id = %message.anchor_id, witness = %message.witness))]
    pub async fn process(&self, message: ProofMessage) -> Result<(), ProofError> {
        // 1. Look up the anchor by id; if not present, fail non-transiently.
        let status = self
            .store
            .get_status(&message.anchor_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ProofError::AnchorNotFound(message.anchor_id.to_string()))?;

        // 2. If already completed, drop.
        if status.status == orb_types::AnchorStatus::Completed {
            debug!("anchor already completed, dropping proof message");
            return Ok(());
        }

        // 3. Validate the proof's clock skew against its issuance date.
        if !within_clock_skew(Utc::now(), message.issuance_date, self.config.clock_skew) {
            return Err(ProofError::ClockSkewExceeded);
        }

        // 4. Persist (anchor id, witness URL, witness kind, proof bytes);
        // idempotent on (anchor_id, witness) at the store layer.
        let proof = orb_types::witness::WitnessProof {
            anchor_id: message.anchor_id.clone(),
            witness: message.witness.clone(),
            kind: message.kind,
            proof: Some(message.proof.clone()),
        };
        self.store.add_proof(&proof).await.map_err(store_err)?;

        // 5. Retrieve the full proof set and hand it to the policy.
        let proofs = self.store.get(&message.anchor_id).await.map_err(store_err)?;
        if !self.policy.evaluate(&proofs) {
            return Ok(());
        }

        // 6. Promote to completed, guarded by a second read so a concurrent
        // subscriber that already promoted this anchor isn't overwritten.
        let mut latest = self
            .store
            .get_status(&message.anchor_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ProofError::AnchorNotFound(message.anchor_id.to_string()))?;
        if latest.try_complete() {
            self.store.add_status(&latest).await.map_err(store_err)?;
            info!("anchor promoted to completed");
        }
        Ok(())
    }

    /// Spawn the long-lived subscriber task. The returned handle completes
    /// once `bus`'s `proof` topic sender is dropped.
    pub fn spawn(self: Arc<Self>, bus: Arc<dyn Bus>) -> JoinHandle<()> {
        let mut rx = bus.subscribe(PROOF_TOPIC);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if let Err(err) = self.process(message).await {
                            warn!(error = %err, "proof message processing failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "proof subscriber lagged behind the bus, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

fn within_clock_skew(now: DateTime<Utc>, issuance_date: DateTime<Utc>, skew: Duration) -> bool {
    (now - issuance_date).abs() <= skew
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_store_memory::MemoryStore;
    use orb_types::{
        anchor::AnchorStatusRecord,
        witness::{WitnessKind, WitnessProof},
        Iri,
    };
    use orb_witness::{AllProofsFilled, AtLeastOneSystemAndOneBatch};

    fn message(anchor: &str, witness: &str, kind: WitnessKind, issuance_date: DateTime<Utc>) -> ProofMessage {
        ProofMessage {
            anchor_id: Iri::from(anchor),
            witness: Iri::from(witness),
            kind,
            proof: vec![1, 2, 3],
            issuance_date,
        }
    }

    fn coordinator(store: Arc<MemoryStore>, policy: Arc<dyn WitnessPolicy>) -> ProofCoordinator {
        ProofCoordinator::new(store, policy, ProofCoordinatorConfig::default())
    }

    #[tokio::test]
    async fn unknown_anchor_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let coord = coordinator(store, Arc::new(AllProofsFilled));
        let result = coord.process(message("anchor-1", "https://w.test", WitnessKind::System, Utc::now())).await;
        assert!(matches!(result, Err(ProofError::AnchorNotFound(_))));
    }

    #[tokio::test]
    async fn completed_anchor_drops_the_message_without_error() {
        let store = Arc::new(MemoryStore::new());
        let mut record = AnchorStatusRecord::new_in_process(Iri::from("anchor-1"), chrono::Duration::hours(1));
        record.try_complete();
        store.add_status(&record).await.unwrap();

        let coord = coordinator(store, Arc::new(AllProofsFilled));
        let result = coord.process(message("anchor-1", "https://w.test", WitnessKind::System, Utc::now())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn clock_skew_outside_window_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_status(&AnchorStatusRecord::new_in_process(Iri::from("anchor-1"), chrono::Duration::hours(1)))
            .await
            .unwrap();

        let coord = ProofCoordinator::new(
            store,
            Arc::new(AllProofsFilled),
            ProofCoordinatorConfig { clock_skew: chrono::Duration::seconds(1) },
        );
        let stale_issuance = Utc::now() - chrono::Duration::days(1);
        let result = coord.process(message("anchor-1", "https://w.test", WitnessKind::System, stale_issuance)).await;
        assert!(matches!(result, Err(ProofError::ClockSkewExceeded)));
    }

    #[tokio::test]
    async fn policy_satisfied_promotes_anchor_to_completed() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_status(&AnchorStatusRecord::new_in_process(Iri::from("anchor-1"), chrono::Duration::hours(1)))
            .await
            .unwrap();
        // Pre-seed a filled batch proof so the system-proof message below
        // satisfies `AtLeastOneSystemAndOneBatch`.
        store
            .add_proof(&WitnessProof {
                anchor_id: Iri::from("anchor-1"),
                witness: Iri::from("https://batch.test"),
                kind: WitnessKind::Batch,
                proof: Some(vec![9]),
            })
            .await
            .unwrap();

        let coord = coordinator(store.clone(), Arc::new(AtLeastOneSystemAndOneBatch));
        coord
            .process(message("anchor-1", "https://system.test", WitnessKind::System, Utc::now()))
            .await
            .unwrap();

        let status = store.get_status(&Iri::from("anchor-1")).await.unwrap().unwrap();
        assert_eq!(status.status, orb_types::AnchorStatus::Completed);
    }

    #[tokio::test]
    async fn policy_unsatisfied_leaves_anchor_in_process() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_status(&AnchorStatusRecord::new_in_process(Iri::from("anchor-1"), chrono::Duration::hours(1)))
            .await
            .unwrap();

        let coord = coordinator(store.clone(), Arc::new(AtLeastOneSystemAndOneBatch));
        coord
            .process(message("anchor-1", "https://system.test", WitnessKind::System, Utc::now()))
            .await
            .unwrap();

        let status = store.get_status(&Iri::from("anchor-1")).await.unwrap().unwrap();
        assert_eq!(status.status, orb_types::AnchorStatus::InProcess);
    }

    #[tokio::test]
    async fn duplicate_proof_from_same_witness_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_status(&AnchorStatusRecord::new_in_process(Iri::from("anchor-1"), chrono::Duration::hours(1)))
            .await
            .unwrap();

        let coord = coordinator(store.clone(), Arc::new(AllProofsFilled));
        coord
            .process(message("anchor-1", "https://system.test", WitnessKind::System, Utc::now()))
            .await
            .unwrap();
        coord
            .process(message("anchor-1", "https://system.test", WitnessKind::System, Utc::now()))
            .await
            .unwrap();

        let proofs = store.get(&Iri::from("anchor-1")).await.unwrap();
        assert_eq!(proofs.len(), 1);
    }
}
