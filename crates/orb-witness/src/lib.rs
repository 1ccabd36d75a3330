#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-witness** – Pluggable witness signer and policy evaluator.
//!
//! Crypto-agnostic by design, mirroring `toka_capability_core`: this crate
//! owns only the two traits spec.md §6 calls out ("Witness and policy
//! (consumed)") plus a couple of reference policy implementations. Wire
//! format details (JWS, COSE, whatever a concrete deployment signs with)
//! live in sibling implementation crates the same way
//! `toka-capability-jwt-hs256` implements `toka_capability_core::Claims`
//! encoding separately from the trait definitions.

use async_trait::async_trait;
use thiserror::Error;

use orb_types::witness::{WitnessKind, WitnessProof};

/// Errors produced by a `Witness` or `WitnessPolicy` implementation.
#[derive(Debug, Error)]
pub enum WitnessError {
    /// The witness collaborator failed to sign or counter-sign the payload.
    #[error("witnessing failed: {0}")]
    SigningFailed(String),
}

/// Behaviour of an external witness: sign or counter-sign an anchor
/// payload and return proof bytes.
///
/// Invoked by the inbox handler's Offer path (spec.md §4.1 Reply protocol):
/// "that collaborator signs or counter-signs the payload and returns proof
/// bytes."
#[async_trait]
pub trait Witness: Send + Sync {
    /// Witness `payload`, returning opaque proof bytes on success.
    async fn witness(&self, payload: &[u8]) -> Result<Vec<u8>, WitnessError>;
}

/// A pluggable predicate over the multiset of collected proofs for an
/// anchor that decides when the anchor is "completed" (spec.md GLOSSARY).
pub trait WitnessPolicy: Send + Sync {
    /// Evaluate whether `proofs` satisfies this policy.
    fn evaluate(&self, proofs: &[WitnessProof]) -> bool;
}

//─────────────────────────────
//  Reference policies
//─────────────────────────────

/// Satisfied once every collected proof row has been filled (i.e. every
/// Offer sent has received a matching Accept). The simplest possible
/// policy; useful for single-witness-set deployments and as a test double.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllProofsFilled;

impl WitnessPolicy for AllProofsFilled {
    fn evaluate(&self, proofs: &[WitnessProof]) -> bool {
        !proofs.is_empty() && proofs.iter().all(WitnessProof::is_filled)
    }
}

/// Satisfied once at least one filled `System` proof AND at least one
/// filled `Batch` proof are present — the example policy spec.md §4.2
/// names explicitly ("at least one system witness AND any batch witness
/// that has a log").
#[derive(Debug, Clone, Copy, Default)]
pub struct AtLeastOneSystemAndOneBatch;

impl WitnessPolicy for AtLeastOneSystemAndOneBatch {
    fn evaluate(&self, proofs: &[WitnessProof]) -> bool {
        let has_system = proofs.iter().any(|p| p.kind == WitnessKind::System && p.is_filled());
        let has_batch = proofs.iter().any(|p| p.kind == WitnessKind::Batch && p.is_filled());
        has_system && has_batch
    }
}

/// A no-op witness that signs by returning the payload unchanged, for tests
/// and local development where no real signing key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoWitness;

#[async_trait]
impl Witness for EchoWitness {
    async fn witness(&self, payload: &[u8]) -> Result<Vec<u8>, WitnessError> {
        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_types::Iri;

    fn proof(kind: WitnessKind, filled: bool) -> WitnessProof {
        WitnessProof {
            anchor_id: Iri::from("anchor-1"),
            witness: Iri::from("https://w.test"),
            kind,
            proof: if filled { Some(vec![1]) } else { None },
        }
    }

    #[test]
    fn all_proofs_filled_requires_non_empty() {
        assert!(!AllProofsFilled.evaluate(&[]));
    }

    #[test]
    fn all_proofs_filled_rejects_any_pending() {
        let proofs = vec![proof(WitnessKind::System, true), proof(WitnessKind::System, false)];
        assert!(!AllProofsFilled.evaluate(&proofs));
    }

    #[test]
    fn system_and_batch_policy_requires_both_kinds() {
        let only_system = vec![proof(WitnessKind::System, true)];
        assert!(!AtLeastOneSystemAndOneBatch.evaluate(&only_system));

        let both = vec![proof(WitnessKind::System, true), proof(WitnessKind::Batch, true)];
        assert!(AtLeastOneSystemAndOneBatch.evaluate(&both));
    }

    #[tokio::test]
    async fn echo_witness_returns_payload_unchanged() {
        let proof = EchoWitness.witness(b"hello").await.unwrap();
        assert_eq!(proof, b"hello");
    }
}
