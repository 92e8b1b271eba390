//! Ray cluster monitor.
//!
//! Polls a Ray dashboard, reshapes node and resource data into a
//! frontend-friendly snapshot and serves the latest snapshot as JSON.

pub mod cache;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod model;
pub mod refresh;
pub mod server;
pub mod snapshot;
pub mod state;
pub mod summary;
pub mod transform;
pub mod usage;
