//! Transparency-log transport: STH, entries, consistency proofs, webfinger
//! (spec.md §4.3).

use async_trait::async_trait;

use orb_types::log::Sth;

use crate::{Cancellation, TransportError};

/// A Merkle consistency proof: an ordered list of 32-byte node hashes, per
/// RFC 6962 §2.1.2.
pub type ConsistencyProof = Vec<[u8; 32]>;

/// Remote calls the log consistency monitor makes once per log per tick.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Fetch the log's current signed tree head.
    async fn get_sth(&self, log_url: &str, cancel: &dyn Cancellation) -> Result<Sth, TransportError>;

    /// Fetch the log's public key via webfinger, base64-decoded into raw
    /// key bytes.
    async fn get_public_key(&self, log_url: &str, cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError>;

    /// Fetch leaf-input bytes for entries `[start, end]` (inclusive),
    /// ordered by index. Callers are responsible for batching requests
    /// larger than `maxGetEntriesRange`.
    async fn get_entries(
        &self,
        log_url: &str,
        start: u64,
        end: u64,
        cancel: &dyn Cancellation,
    ) -> Result<Vec<Vec<u8>>, TransportError>;

    /// Fetch a consistency proof between tree sizes `first` and `second`
    /// (`first <= second`).
    async fn get_consistency_proof(
        &self,
        log_url: &str,
        first: u64,
        second: u64,
        cancel: &dyn Cancellation,
    ) -> Result<ConsistencyProof, TransportError>;
}
