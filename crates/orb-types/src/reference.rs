//! `Reference` triples and their closed kind enumeration.

use serde::{Deserialize, Serialize};

use crate::Iri;

/// The closed enumeration of reference kinds tracked by the Reference Store.
///
/// Adding a new kind here requires updating every store backend's schema, so
/// the set is intentionally closed rather than an open string tag (spec.md
/// §3: "K drawn from a closed enumeration").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ReferenceKind {
    /// `object` is followed by `target`.
    Follower,
    /// `object` follows `target`.
    Following,
    /// `object` is witnessed by `target`.
    Witness,
    /// `object` is witnessing `target`.
    Witnessing,
    /// `object` liked `target` (an anchor or an Offer).
    Like,
    /// `object` has liked `target`.
    Liked,
    /// `object`'s anchor was shared by the announce with id `target`.
    Share,
    /// `object` (this node) has linked anchor `target` into its linkset -
    /// used for the duplicate-anchor dedupe check (spec.md Invariant 6).
    AnchorLinkset,
    /// `object`'s inbox is at `target`.
    Inbox,
    /// `object`'s outbox is at `target`.
    Outbox,
}

/// A `(kind, object, target)` triple tracking a named relationship.
///
/// Multi-set with uniqueness by the full triple (spec.md §3): adding the
/// same triple twice is idempotent, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The kind of relationship this triple records.
    pub kind: ReferenceKind,
    /// The IRI of the object side of the relationship (usually "us").
    pub object: Iri,
    /// The IRI of the target side of the relationship (usually "them").
    pub target: Iri,
}

impl Reference {
    /// Construct a new reference triple.
    pub fn new(kind: ReferenceKind, object: Iri, target: Iri) -> Self {
        Self { kind, object, target }
    }
}

/// Optional filter criteria for `QueryReferences`, each field independently
/// optional (spec.md §6: `{referenceKind, objectIRI, referenceIRI}`).
#[derive(Debug, Clone, Default)]
pub struct ReferenceCriteria {
    /// Restrict to this kind, if set.
    pub kind: Option<ReferenceKind>,
    /// Restrict to this object IRI, if set.
    pub object: Option<Iri>,
    /// Restrict to this target IRI, if set.
    pub target: Option<Iri>,
}

impl ReferenceCriteria {
    /// True if `reference` satisfies every set field of this criteria.
    pub fn matches(&self, reference: &Reference) -> bool {
        if let Some(kind) = self.kind {
            if reference.kind != kind {
                return false;
            }
        }
        if let Some(object) = &self.object {
            if &reference.object != object {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if &reference.target != target {
                return false;
            }
        }
        true
    }
}
