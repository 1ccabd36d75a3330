//! Federated `Actor`.

use serde::{Deserialize, Serialize};

use crate::Iri;

/// A federated node, cached by IRI on first contact.
///
/// Actors are borrowed values: cached in the store but re-fetched via a
/// transport collaborator on cache miss (spec.md §3 Ownership). Cross-entity
/// references are always by IRI, never by in-memory handle, which removes
/// any need for weak pointers or reference cycles (spec.md §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor id (URL).
    pub id: Iri,
    /// The actor's inbox URL.
    pub inbox: Iri,
    /// Optional public key material, base64-encoded, used to verify
    /// signed requests originating from this actor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Freeform service metadata (display name, service endpoints, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub service_metadata: serde_json::Map<String, serde_json::Value>,
}

impl Actor {
    /// Construct a minimal actor with no key material or metadata.
    pub fn new(id: Iri, inbox: Iri) -> Self {
        Self {
            id,
            inbox,
            public_key: None,
            service_metadata: serde_json::Map::new(),
        }
    }
}
