//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that reports
//! whether the last refresh cycle produced a usable snapshot.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    state.metrics.http_requests.inc();

    let snapshot = state.cache.get_snapshot().await;

    // Derive HTTP status from the last installed snapshot
    let (status, message) = match &snapshot {
        Some(s) if s.result => (StatusCode::OK, "OK"),
        Some(_) => (StatusCode::SERVICE_UNAVAILABLE, "Last refresh failed"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No snapshot yet"),
    };

    let mut out = String::new();
    writeln!(out, "{message}").ok();
    writeln!(out).ok();
    writeln!(out, "{:20} | {}", "Dashboard", state.source.origin()).ok();
    writeln!(out, "{:20} | {}s", "Uptime", state.started_at.elapsed().as_secs()).ok();
    writeln!(
        out,
        "{:20} | {}",
        "Refresh cycles",
        state.metrics.refresh_cycles.get()
    )
    .ok();
    if let Some(s) = &snapshot {
        writeln!(out, "{:20} | {}", "Last refresh", s.timestamp).ok();
        writeln!(out, "{:20} | {}", "Last message", s.msg).ok();
        writeln!(out, "{:20} | {}", "Nodes", s.node_count()).ok();
    }

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        out,
    )
}
