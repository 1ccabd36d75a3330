//! Witness proofs and witness kinds.

use serde::{Deserialize, Serialize};

use crate::Iri;

/// The kind of witness that produced a proof.
///
/// Opaque to the core (spec.md §4.2): the [`crate`] of policy evaluators
/// interprets these tags (e.g. "at least one system witness AND any batch
/// witness that has a log"), the engine itself just stores and retrieves
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WitnessKind {
    /// A system witness (typically this node's own federation peers).
    System,
    /// A batch witness (typically a transparency-log-backed third party).
    Batch,
}

/// One row in the witness-proof store: `(anchor id, witness URL, witness
/// kind, proof bytes or null)`.
///
/// A null row is created when an Offer is sent; it is filled on Accept when
/// the corresponding receipt arrives (spec.md §3). `AddProof` must be
/// idempotent on `(anchor_id, witness)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessProof {
    /// The anchor this proof concerns.
    pub anchor_id: Iri,
    /// The witness actor that produced (or is expected to produce) it.
    pub witness: Iri,
    /// The kind of witness.
    pub kind: WitnessKind,
    /// Proof bytes, or `None` for a not-yet-filled row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Vec<u8>>,
}

impl WitnessProof {
    /// Construct the not-yet-filled row created when an Offer is sent.
    pub fn pending(anchor_id: Iri, witness: Iri, kind: WitnessKind) -> Self {
        Self { anchor_id, witness, kind, proof: None }
    }

    /// True once the corresponding receipt has filled in proof bytes.
    pub fn is_filled(&self) -> bool {
        self.proof.is_some()
    }
}
