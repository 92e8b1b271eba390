//! CLI command implementations for ray-cluster-monitor.
//!
//! This module provides implementations for all CLI subcommands:
//! - `snapshot`: One refresh cycle printed as JSON
//! - `check`: Dashboard reachability check
//! - `generate-testdata`: Synthetic node payload generation

pub mod check;
pub mod generate;
pub mod snapshot;

// Re-export command functions
pub use check::command_check;
pub use generate::command_generate_testdata;
pub use snapshot::command_snapshot;
