//! Pluggable authorization for inbound Follow and Invite-witness requests.
//!
//! Kept distinct from [`orb_witness::WitnessPolicy`]: that evaluator decides
//! when an anchor's proof collection is complete, this one decides whether
//! to accept a relationship request at all. Both are intentionally small,
//! swappable predicates rather than baked-in logic, the same
//! crypto/policy-agnostic trait seam `toka_capability_core::TokenValidator`
//! uses.

use orb_types::Iri;

/// Decides whether to accept an inbound Follow or Invite-witness request.
pub trait RelationshipAuthorizer: Send + Sync {
    /// Authorize a Follow request from `follower`.
    fn authorize_follow(&self, follower: &Iri) -> bool;

    /// Authorize a witness Invite from `inviter`.
    fn authorize_witness_invite(&self, inviter: &Iri) -> bool;
}

/// Accepts every request unconditionally - the default for local
/// development and for tests that don't exercise the reject path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RelationshipAuthorizer for AllowAll {
    fn authorize_follow(&self, _follower: &Iri) -> bool {
        true
    }

    fn authorize_witness_invite(&self, _inviter: &Iri) -> bool {
        true
    }
}

/// Rejects every request unconditionally, useful for exercising the Reject
/// path in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl RelationshipAuthorizer for DenyAll {
    fn authorize_follow(&self, _follower: &Iri) -> bool {
        false
    }

    fn authorize_witness_invite(&self, _inviter: &Iri) -> bool {
        false
    }
}
