//! CLI arguments and subcommands for ray-cluster-monitor.
//!
//! This module defines the command-line interface structure using the clap
//! library. The command line is the only configuration surface; there is no
//! config file and no environment lookup.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "ray-cluster-monitor",
    about = "Republishes a simplified Ray cluster snapshot as JSON",
    long_about = "Republishes a simplified Ray cluster snapshot as JSON.\n\n\
                  Polls the Ray dashboard every 10 seconds, reshapes node and resource \
                  data for a dashboard frontend and serves the latest snapshot on every \
                  HTTP path. Per-node usage percentages are simulated.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Ray dashboard base URL
    #[arg(long)]
    pub dashboard_url: Option<String>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Candidate listen ports, tried in order (comma-separated)
    #[arg(short = 'p', long, value_delimiter = ',')]
    pub ports: Option<Vec<u16>>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Expose /metrics and /health next to the snapshot endpoint
    #[arg(long)]
    pub enable_telemetry: bool,

    /// Replay a recorded /api/v0/nodes payload instead of polling the dashboard
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,

    /// Print effective config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one refresh cycle and print the snapshot JSON
    Snapshot {
        /// Write to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Check that the dashboard endpoints are reachable
    Check,

    /// Generate a synthetic /api/v0/nodes payload for --test-data-file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.json")]
        output: PathBuf,

        /// Number of nodes, the first one being the head node
        #[arg(long, default_value_t = 6)]
        nodes: usize,

        /// How many of the nodes carry GPUs
        #[arg(long, default_value_t = 2)]
        gpu_nodes: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ray-cluster-monitor"]);
        assert!(args.command.is_none());
        assert!(args.ports.is_none());
        assert!(args.dashboard_url.is_none());
        assert!(!args.enable_telemetry);
        assert!(matches!(args.log_level, LogLevel::Info));
    }

    #[test]
    fn test_port_list_and_subcommand() {
        let args = Args::parse_from([
            "ray-cluster-monitor",
            "--ports",
            "8080,8081",
            "--dashboard-url",
            "http://ray-head:8265",
            "snapshot",
            "-o",
            "out.json",
        ]);
        assert_eq!(args.ports, Some(vec![8080, 8081]));
        assert_eq!(args.dashboard_url.as_deref(), Some("http://ray-head:8265"));
        assert!(matches!(args.command, Some(Commands::Snapshot { output: Some(_) })));
    }

    #[test]
    fn test_generate_testdata_defaults() {
        let args = Args::parse_from(["ray-cluster-monitor", "generate-testdata"]);
        match args.command {
            Some(Commands::GenerateTestdata {
                output,
                nodes,
                gpu_nodes,
            }) => {
                assert_eq!(output, PathBuf::from("testdata.json"));
                assert_eq!(nodes, 6);
                assert_eq!(gpu_nodes, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
