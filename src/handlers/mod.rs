//! HTTP endpoint handlers for the monitor.
//!
//! This module provides handlers for all HTTP endpoints:
//! - every path: the cluster snapshot as JSON
//! - `/metrics`: Prometheus metrics endpoint (telemetry only)
//! - `/health`: Health check endpoint (telemetry only)

pub mod health;
pub mod metrics;
pub mod snapshot;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use snapshot::{cors_headers, snapshot_handler};
