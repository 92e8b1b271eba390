//! ray-cluster-monitor
//!
//! Polls the Ray dashboard every 10 seconds and serves a simplified cluster
//! snapshot as JSON on every HTTP path.

use anyhow::Context;
use clap::Parser;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info, Level};

use ray_cluster_monitor::cli::{Args, Commands, LogLevel};
use ray_cluster_monitor::client::{DashboardClient, FileNodeSource, NodeSource};
use ray_cluster_monitor::commands::{command_check, command_generate_testdata, command_snapshot};
use ray_cluster_monitor::config::{render_config, resolve_config, validate_config, Config};
use ray_cluster_monitor::refresh::{refresh_once, RefreshTask, REFRESH_INTERVAL};
use ray_cluster_monitor::server::{bind_first_available, build_router, shutdown_signal};
use ray_cluster_monitor::state::AppState;
use ray_cluster_monitor::usage::{SimulatedUsage, UsageSource};

fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Picks the replay file when given, the live dashboard otherwise.
fn build_source(config: &Config) -> anyhow::Result<Arc<dyn NodeSource>> {
    Ok(match &config.test_data_file {
        Some(path) => {
            info!("Replaying node data from {}", path.display());
            Arc::new(FileNodeSource::new(path))
        }
        None => Arc::new(
            DashboardClient::new(&config.dashboard_url)
                .context("failed to build dashboard client")?,
        ),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args);

    if args.check_config {
        if let Err(e) = validate_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        print!("{}", render_config(&config, args.config_format)?);
        return Ok(());
    }

    // Generating test data needs neither a dashboard nor a valid port list.
    if let Some(Commands::GenerateTestdata {
        output,
        nodes,
        gpu_nodes,
    }) = &args.command
    {
        return command_generate_testdata(output.clone(), *nodes, *gpu_nodes);
    }

    if let Err(e) = validate_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&args);

    let source = build_source(&config)?;
    let usage: Arc<dyn UsageSource> = Arc::new(SimulatedUsage);

    match &args.command {
        Some(Commands::Snapshot { output }) => {
            return command_snapshot(source, usage, output.clone()).await;
        }
        Some(Commands::Check) => {
            if !command_check(source.as_ref()).await {
                std::process::exit(1);
            }
            return Ok(());
        }
        Some(Commands::GenerateTestdata { .. }) | None => {}
    }

    let bind: IpAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.bind))?;
    let ports = config.ports.clone();

    info!(
        "Starting ray-cluster-monitor for {} (telemetry: {})",
        source.origin(),
        config.enable_telemetry
    );
    let state = AppState::new(config, source, usage).context("failed to register metrics")?;

    // Perform the first refresh before serving so clients rarely see a placeholder
    info!("Performing initial refresh");
    refresh_once(&state).await;

    let refresh_task = RefreshTask::spawn(state.clone(), REFRESH_INTERVAL);

    match bind_first_available(bind, &ports).await {
        Some(listener) => {
            let app = build_router(state.clone());
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!("Server error: {}", e);
            }
        }
        None => {
            // Keep refreshing without an HTTP surface until asked to stop.
            shutdown_signal().await;
        }
    }

    refresh_task.shutdown().await;

    info!("ray-cluster-monitor stopped gracefully");
    Ok(())
}
