//! HTTP server wiring: routes, port selection and shutdown signals.

use axum::{routing::get, Router};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, warn};

use crate::handlers::{health_handler, metrics_handler, snapshot_handler};
use crate::state::SharedState;

/// Builds the router. Every path serves the snapshot; `/metrics` and
/// `/health` are only routed when telemetry is enabled.
pub fn build_router(state: SharedState) -> Router {
    let mut app = Router::new();

    if state.config.enable_telemetry {
        debug!("Telemetry endpoints enabled at /metrics and /health");
        app = app
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler));
    }

    app.fallback(snapshot_handler).with_state(state)
}

/// Binds the first candidate port that accepts a listener.
///
/// Ports already in use are skipped with a warning; any other bind error is
/// logged and the next port is tried as well.
pub async fn bind_first_available(bind: IpAddr, ports: &[u16]) -> Option<TcpListener> {
    for &port in ports {
        let addr = SocketAddr::new(bind, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Listening on http://{}", addr);
                return Some(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!("Port {} is already in use, trying next port", port);
            }
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
            }
        }
    }

    error!(
        "None of the candidate ports {:?} could be bound; serving nothing",
        ports
    );
    None
}

/// Resolves once SIGINT or SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
