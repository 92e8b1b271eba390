//! Snapshot endpoint handler.
//!
//! Every path answers with the cached snapshot. Clients are browser
//! dashboards served from other origins, so every response carries
//! permissive CORS headers.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, instrument};

use crate::snapshot::Snapshot;
use crate::state::SharedState;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Headers attached to every snapshot response.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers
}

/// Fallback handler serving the snapshot regardless of path or query.
#[instrument(skip(state, method, uri), fields(method = %method, path = %uri.path()))]
pub async fn snapshot_handler(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
) -> Response {
    debug!("Processing snapshot request");

    state.metrics.http_requests.inc();

    match method {
        Method::OPTIONS => (StatusCode::OK, cors_headers()).into_response(),
        Method::GET | Method::HEAD => {
            // Serialize while holding only the Arc, never the cache lock.
            let body = match state.cache.get_snapshot().await {
                Some(snapshot) => serde_json::to_string_pretty(snapshot.as_ref()),
                None => serde_json::to_string_pretty(&Snapshot::not_ready()),
            };

            match body {
                Ok(body) => {
                    let mut headers = cors_headers();
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(JSON_CONTENT_TYPE),
                    );
                    (StatusCode::OK, headers, body).into_response()
                }
                Err(e) => {
                    error!("Failed to serialize snapshot: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        cors_headers(),
                        "Failed to serialize snapshot",
                    )
                        .into_response()
                }
            }
        }
        _ => (StatusCode::METHOD_NOT_ALLOWED, cors_headers()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FetchError, NodeSource};
    use crate::config::Config;
    use crate::model::{ClusterResources, RawNode};
    use crate::state::AppState;
    use crate::usage::SimulatedUsage;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait]
    impl NodeSource for EmptySource {
        async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError> {
            Ok(None)
        }

        fn origin(&self) -> &str {
            "http://ray-head:8265"
        }
    }

    fn test_state() -> SharedState {
        AppState::new(
            Config::default(),
            Arc::new(EmptySource),
            Arc::new(SimulatedUsage),
        )
        .unwrap()
    }

    async fn call(state: &SharedState, method: Method, uri: &str) -> Response {
        snapshot_handler(State(state.clone()), method, uri.parse().unwrap()).await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    }

    #[tokio::test]
    async fn test_not_ready_placeholder() {
        let state = test_state();
        let response = call(&state, Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(response.headers());
        assert_eq!(response.headers()["content-type"], JSON_CONTENT_TYPE);

        let v = body_json(response).await;
        assert_eq!(v["result"], false);
        assert_eq!(v["msg"], "数据尚未准备就绪");
        assert!(v["data"].is_null());
    }

    #[tokio::test]
    async fn test_any_path_returns_same_snapshot() {
        let state = test_state();
        state.cache.set_snapshot(Snapshot::failure("boom")).await;

        let a = body_json(call(&state, Method::GET, "/").await).await;
        let b = body_json(call(&state, Method::GET, "/anything/else?x=1").await).await;
        assert_eq!(a, b);
        assert_eq!(a["msg"], "错误: boom");
        assert_eq!(state.metrics.http_requests.get(), 2);
    }

    #[tokio::test]
    async fn test_options_and_unsupported_methods() {
        let state = test_state();

        let response = call(&state, Method::OPTIONS, "/nodes").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(response.headers());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());

        let response = call(&state, Method::DELETE, "/").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(response.headers());
    }

    #[tokio::test]
    async fn test_response_is_utf8_not_escaped() {
        let state = test_state();
        state.cache.set_snapshot(Snapshot::failure("超时")).await;
        let response = call(&state, Method::GET, "/").await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("错误: 超时"));
        assert!(!text.contains("\\u"));
    }
}
