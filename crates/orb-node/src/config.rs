//! Layered node configuration: built-in defaults, overridden by an optional
//! config file, overridden by `ORB_*` environment variables - the same
//! three-source layering `toka-runtime`'s `RuntimeConfig` documents, just
//! expressed through the `config` crate's builder instead of being
//! hand-assembled.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's own service IRI. Required in any real deployment; the
    /// default is only sensible for local smoke-testing.
    pub self_iri: String,
    /// `tracing-subscriber` env-filter directive, e.g. `"info"` or
    /// `"orb_engine=debug,info"`.
    pub log_filter: String,
    /// Seconds between log consistency monitor ticks.
    pub tick_interval_secs: u64,
    /// TTL applied to a freshly-created `in-process` anchor status row.
    pub anchor_in_process_ttl_hours: i64,
    /// Per-subscriber channel buffer for the Activity Engine's own
    /// `Subscribe()` contract.
    pub subscriber_buffer: usize,
    /// Proof coordinator's clock-skew tolerance, in days.
    pub proof_clock_skew_days: i64,
    /// Log consistency monitor tuning and the set of logs to watch.
    pub log_monitor: LogMonitorSettings,
}

/// Log consistency monitor configuration (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMonitorSettings {
    /// Log base URLs to mark active on startup.
    pub active_logs: Vec<String>,
    /// See `orb_logmonitor::DEFAULT_MAX_TREE_SIZE`.
    pub max_tree_size: u64,
    /// See `orb_logmonitor::DEFAULT_MAX_GET_ENTRIES_RANGE`.
    pub max_get_entries_range: u64,
    /// See `orb_logmonitor::DEFAULT_MAX_RECOVERY_FETCH_SIZE`.
    pub max_recovery_fetch_size: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            self_iri: "https://localhost/actors/orb".to_string(),
            log_filter: "info".to_string(),
            tick_interval_secs: 60,
            anchor_in_process_ttl_hours: 24,
            subscriber_buffer: orb_bus_core::subscriber::DEFAULT_SUBSCRIBER_BUFFER,
            proof_clock_skew_days: 3650,
            log_monitor: LogMonitorSettings::default(),
        }
    }
}

impl Default for LogMonitorSettings {
    fn default() -> Self {
        Self {
            active_logs: Vec::new(),
            max_tree_size: orb_logmonitor::DEFAULT_MAX_TREE_SIZE,
            max_get_entries_range: orb_logmonitor::DEFAULT_MAX_GET_ENTRIES_RANGE,
            max_recovery_fetch_size: orb_logmonitor::DEFAULT_MAX_RECOVERY_FETCH_SIZE,
        }
    }
}

impl NodeConfig {
    /// Load configuration from, in increasing priority order: built-in
    /// defaults, an optional file at `path` (if it exists), then `ORB_*`
    /// environment variables (`ORB_SELF_IRI`, `ORB_LOG_MONITOR__MAX_TREE_SIZE`,
    /// ...).
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&NodeConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("ORB").separator("__"));
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Convenience accessor for the tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
