//! Topic-keyed publish/subscribe bus, generalizing
//! `toka_bus_core::InMemoryBus` from a single implicit topic to a small
//! registry of named topics (currently just [`crate::PROOF_TOPIC`]).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::ProofMessage;

/// Default ring-buffer capacity for a newly-created topic.
const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// Errors that can occur during bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// No subscriber currently exists for the topic (publish still
    /// succeeds - this only matters to callers that want to know whether
    /// anyone is listening).
    #[error("no subscribers for topic {0}")]
    NoSubscribers(String),
}

/// Publish/subscribe abstraction over [`ProofMessage`]s.
///
/// Implementations must be thread-safe and support multiple concurrent
/// subscribers per topic, mirroring `toka_bus_core::EventBus`.
pub trait Bus: Send + Sync {
    /// Publish a message onto `topic`. Never blocks on subscriber
    /// processing; if a subscriber's buffer is full, it may miss the
    /// message (standard broadcast-channel lagging behavior).
    fn publish(&self, topic: &str, message: ProofMessage) -> Result<(), BusError>;

    /// Subscribe to `topic`, creating it with default capacity if it
    /// doesn't exist yet.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<ProofMessage>;
}

/// Simple in-memory, broadcast-backed pub/sub bus keyed by topic name.
#[derive(Clone)]
pub struct InMemoryBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<ProofMessage>>>>,
    capacity: usize,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl InMemoryBus {
    /// Create a new bus whose topics each get a ring buffer of `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self { topics: Arc::new(RwLock::new(HashMap::new())), capacity }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<ProofMessage> {
        // Fast path: topic already exists.
        if let Some(tx) = self.topics.read().get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Bus for InMemoryBus {
    fn publish(&self, topic: &str, message: ProofMessage) -> Result<(), BusError> {
        let tx = self.sender_for(topic);
        // A send error here just means zero receivers are currently
        // attached; that's not a publish failure (mirrors
        // `toka_bus_core::InMemoryBus::publish` ignoring lagging-receiver
        // errors).
        let _ = tx.send(message);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<ProofMessage> {
        self.sender_for(topic).subscribe()
    }
}
