#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-node** – Federation node: wires the Reference Store, Activity
//! Engine (one instance per role), the witness/proof coordinator, and the
//! transparency-log consistency monitor together, the way `toka-runtime`
//! assembles a kernel, a storage backend, and the orchestration layer
//! behind one entry point.
//!
//! The `orb-node` binary (`src/main.rs`) is a thin CLI/tracing wrapper
//! around [`Node`], matching the `toka-cli` / `toka-runtime` split: the
//! library half owns wiring and lifecycle, the binary half owns argument
//! parsing and process setup.

use std::sync::Arc;

use anyhow::Result;

use orb_bus_core::InMemoryBus;
use orb_engine::{auth::AllowAll, ActivityEngine, EngineConfig, EngineOutcome, Role};
use orb_logmonitor::{AcceptAllSths, LogConsistencyMonitor, MonitorConfig};
use orb_proof::{ProofCoordinator, ProofCoordinatorConfig};
use orb_store_core::ReferenceStoreApi;
use orb_store_memory::MemoryStore;
use orb_types::{activity::Activity, log::LogMonitorRecord, Iri};
use orb_witness::{AtLeastOneSystemAndOneBatch, EchoWitness};

/// Reference collaborator implementations for local development.
pub mod adapters;
/// Layered node configuration.
pub mod config;

use adapters::{IntervalScheduler, LoggingActivityTransport, NullActorResolver, NullLogTransport};
use config::NodeConfig;

/// All the long-lived collaborators one running node owns.
pub struct Node {
    inbox: ActivityEngine,
    outbox: ActivityEngine,
    proof_coordinator: Arc<ProofCoordinator>,
    log_monitor: Arc<LogConsistencyMonitor>,
    bus: Arc<InMemoryBus>,
}

impl Node {
    /// Assemble every collaborator and start the Activity Engine pair.
    /// Background tasks (proof coordinator, log monitor) are not spawned
    /// until [`Node::run`].
    pub async fn new(config: &NodeConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new(config.subscriber_buffer));
        let transport = Arc::new(LoggingActivityTransport);
        let witness = Arc::new(EchoWitness);
        let authorizer = Arc::new(AllowAll);
        let actor_resolver = Arc::new(NullActorResolver);

        let engine_config = EngineConfig {
            self_iri: Iri::from(config.self_iri.as_str()),
            anchor_in_process_ttl: chrono::Duration::hours(config.anchor_in_process_ttl_hours),
            subscriber_buffer: config.subscriber_buffer,
        };

        let inbox = ActivityEngine::new(
            Role::Inbox,
            engine_config.clone(),
            store.clone(),
            transport.clone(),
            witness.clone(),
            bus.clone(),
            authorizer.clone(),
            actor_resolver.clone(),
        );
        let outbox = ActivityEngine::new(
            Role::Outbox,
            engine_config,
            store.clone(),
            transport,
            witness,
            bus.clone(),
            authorizer,
            actor_resolver,
        );
        inbox.start();
        outbox.start();

        let proof_coordinator = Arc::new(ProofCoordinator::new(
            store.clone(),
            Arc::new(AtLeastOneSystemAndOneBatch),
            ProofCoordinatorConfig { clock_skew: chrono::Duration::days(config.proof_clock_skew_days) },
        ));

        for log_url in &config.log_monitor.active_logs {
            store.put_monitor(&LogMonitorRecord::new(log_url.clone())).await?;
        }
        if !config.log_monitor.active_logs.is_empty() {
            tracing::warn!(
                count = config.log_monitor.active_logs.len(),
                "active logs configured but no LogTransport adapter is wired; ticks will fail until one is injected"
            );
        }
        let log_monitor = Arc::new(LogConsistencyMonitor::new(
            store,
            Arc::new(NullLogTransport),
            Arc::new(AcceptAllSths),
            MonitorConfig {
                max_tree_size: config.log_monitor.max_tree_size,
                max_get_entries_range: config.log_monitor.max_get_entries_range,
                max_recovery_fetch_size: config.log_monitor.max_recovery_fetch_size,
            },
        ));

        Ok(Self { inbox, outbox, proof_coordinator, log_monitor, bus })
    }

    /// Start the proof coordinator and log monitor background tasks, then
    /// block until ctrl-c.
    pub async fn run(self, tick_interval: std::time::Duration) -> Result<()> {
        let _proof_task = self.proof_coordinator.spawn(self.bus.clone());
        let _monitor_task = self.log_monitor.clone().spawn(Box::new(IntervalScheduler::new(tick_interval)));

        tracing::info!("orb-node started");
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");

        self.inbox.stop().await;
        self.outbox.stop().await;
        Ok(())
    }

    /// Submit an activity arriving at this node's inbox, routing any reply
    /// the inbox handler produces (Accept/Reject, or an Accept-of-Offer)
    /// through the sibling outbox engine for delivery - the wiring
    /// `orb-engine`'s `EngineOutcome.reply` contract leaves to the node
    /// (DESIGN.md "orb-engine" entry).
    pub async fn submit_inbound(&self, activity: Activity) -> Result<EngineOutcome, orb_types::EngineError> {
        let outcome = self.inbox.handle(activity).await?;
        if let Some(reply) = outcome.reply.clone() {
            self.outbox.handle(reply).await?;
        }
        Ok(outcome)
    }

    /// Submit an activity this node originates, for delivery via the
    /// outbox engine.
    pub async fn submit_outbound(&self, activity: Activity) -> Result<EngineOutcome, orb_types::EngineError> {
        self.outbox.handle(activity).await
    }
}
