//! Metrics endpoint handler for Prometheus scraping.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, instrument};

use crate::metrics::encode;
use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<Response, MetricsError> {
    debug!("Processing /metrics request");

    state.metrics.http_requests.inc();

    let body = encode(&state.registry).map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FileNodeSource;
    use crate::config::Config;
    use crate::snapshot::Snapshot;
    use crate::state::AppState;
    use crate::usage::SimulatedUsage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_metrics_exposes_refresh_state() {
        let state = AppState::new(
            Config::default(),
            Arc::new(FileNodeSource::new("/tmp/unused.json")),
            Arc::new(SimulatedUsage),
        )
        .unwrap();
        state
            .metrics
            .observe_refresh(&Snapshot::failure("down"), 0.5);

        let response = metrics_handler(State(state)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("ray_monitor_refresh_cycles_total 1"));
        assert!(text.contains("ray_monitor_http_requests_total 1"));
    }
}
