//! Application state management for the monitor.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background refresh task.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::SnapshotCache;
use crate::client::NodeSource;
use crate::config::Config;
use crate::metrics::MonitorMetrics;
use crate::usage::UsageSource;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Application state shared across requests and the refresh task.
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub source: Arc<dyn NodeSource>,
    pub usage: Arc<dyn UsageSource>,
    pub registry: Registry,
    pub metrics: MonitorMetrics,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state with a fresh registry and an empty cache.
    pub fn new(
        config: Config,
        source: Arc<dyn NodeSource>,
        usage: Arc<dyn UsageSource>,
    ) -> Result<SharedState, prometheus::Error> {
        let registry = Registry::new();
        let metrics = MonitorMetrics::new(&registry)?;
        Ok(Arc::new(AppState {
            cache: Arc::new(SnapshotCache::new()),
            source,
            usage,
            registry,
            metrics,
            config: Arc::new(config),
            started_at: Instant::now(),
        }))
    }
}
