//! Content-addressed storage client used to dereference anchor payloads.

use async_trait::async_trait;

use crate::{Cancellation, TransportError};

/// Fetch anchor payloads by content hash.
///
/// spec.md §1 scopes the CAS protocol itself out; this trait is the only
/// surface the core needs: given a hash, return the bytes, or fail.
#[async_trait]
pub trait CasClient: Send + Sync {
    /// Fetch the content addressed by `hash` (an opaque, implementation
    /// defined content identifier string, e.g. a multihash).
    async fn get(&self, hash: &str, cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError>;
}
