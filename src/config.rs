//! Effective configuration resolved from the command line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::cli::{Args, ConfigFormat, LogLevel};
use crate::client::DEFAULT_DASHBOARD_URL;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORTS: [u16; 5] = [8888, 9999, 7777, 6666, 5555];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("at least one candidate port is required")]
    NoPorts,
    #[error("port 0 is not a valid candidate")]
    ZeroPort,
    #[error("port {0} is listed more than once")]
    DuplicatePort(u16),
    #[error("dashboard URL '{0}' must start with http:// or https://")]
    InvalidDashboardUrl(String),
    #[error("test data file not found: {0}")]
    MissingTestData(PathBuf),
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub dashboard_url: String,
    pub bind: String,
    pub ports: Vec<u16>,
    pub log_level: String,
    pub enable_telemetry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            bind: DEFAULT_BIND_ADDR.to_string(),
            ports: DEFAULT_PORTS.to_vec(),
            log_level: "info".into(),
            enable_telemetry: false,
            test_data_file: None,
        }
    }
}

fn log_level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Off => "off",
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Resolves configuration: CLI (if provided) > default.
pub fn resolve_config(args: &Args) -> Config {
    let mut config = Config::default();

    if let Some(url) = &args.dashboard_url {
        config.dashboard_url = url.trim().to_string();
    }
    if let Some(bind_ip) = args.bind {
        config.bind = bind_ip.to_string();
    }
    if let Some(ports) = &args.ports {
        config.ports = ports.clone();
    }
    config.log_level = log_level_name(args.log_level).to_string();
    config.enable_telemetry = args.enable_telemetry;
    config.test_data_file = args.test_data_file.clone();

    config
}

/// Validates effective config (used by --check-config and at startup)
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.ports.is_empty() {
        return Err(ConfigError::NoPorts);
    }
    if cfg.ports.contains(&0) {
        return Err(ConfigError::ZeroPort);
    }
    for (i, port) in cfg.ports.iter().enumerate() {
        if cfg.ports[..i].contains(port) {
            return Err(ConfigError::DuplicatePort(*port));
        }
    }

    // A replayed payload makes the dashboard URL irrelevant.
    match &cfg.test_data_file {
        Some(path) if !path.exists() => {
            return Err(ConfigError::MissingTestData(path.clone()));
        }
        Some(_) => {}
        None => {
            let url = cfg.dashboard_url.as_str();
            let valid = match reqwest::Url::parse(url) {
                Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
                Err(_) => false,
            };
            if !valid {
                return Err(ConfigError::InvalidDashboardUrl(url.to_string()));
            }
        }
    }

    Ok(())
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}
