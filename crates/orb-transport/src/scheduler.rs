//! External periodic-tick trigger for the log consistency monitor.

use async_trait::async_trait;

/// A periodic trigger driving the monitor's per-log tick (spec.md §2:
/// "The monitor runs on a periodic trigger (a tick driven by a scheduler
/// collaborator)").
///
/// `orb-node`'s default implementation wraps `tokio::time::interval`; this
/// trait exists so callers that already run their own cron/timer
/// infrastructure can drive ticks externally instead.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Block until the next tick is due.
    async fn tick(&mut self);
}
