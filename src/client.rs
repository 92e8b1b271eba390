//! Clients for the Ray dashboard.
//!
//! [`NodeSource`] is the seam between the refresh loop and wherever node
//! records come from: the live dashboard ([`DashboardClient`]) or a recorded
//! payload on disk ([`FileNodeSource`]).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::model::{ClusterResources, ClusterStatusEnvelope, NodesEnvelope, RawNode};

/// Upper bound for one request to the dashboard.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default Ray dashboard address.
pub const DEFAULT_DASHBOARD_URL: &str = "http://10.30.2.11:8265";

const NODES_PATH: &str = "/api/v0/nodes";
const CLUSTER_STATUS_PATH: &str = "/api/cluster_status";

/// Errors raised while fetching data from the dashboard.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("dashboard returned HTTP {0}")]
    Status(StatusCode),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e)
        }
    }
}

/// Source of raw node records and cluster-wide capacity.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetches the node list. A payload without the expected nesting gives
    /// an empty list, not an error.
    async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError>;

    /// Fetches cluster-wide totals and availability, if the source knows
    /// them.
    async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError>;

    /// Human-readable origin, echoed to clients as `dashboardUrl`.
    fn origin(&self) -> &str;
}

/// HTTP client for a live Ray dashboard.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: Client,
    base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, FETCH_TIMEOUT)
    }

    pub(crate) fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl NodeSource for DashboardClient {
    async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError> {
        let body = self.get_bytes(NODES_PATH).await?;
        let envelope: NodesEnvelope = serde_json::from_slice(&body)?;
        Ok(envelope.into_nodes())
    }

    async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError> {
        let body = self.get_bytes(CLUSTER_STATUS_PATH).await?;
        let envelope: ClusterStatusEnvelope = serde_json::from_slice(&body)?;
        Ok(envelope.into_resources())
    }

    fn origin(&self) -> &str {
        &self.base_url
    }
}

/// Replays a `/api/v0/nodes` payload stored on disk.
///
/// The file is re-read on every fetch so it can be edited while the monitor
/// runs.
#[derive(Debug, Clone)]
pub struct FileNodeSource {
    path: PathBuf,
    origin: String,
}

impl FileNodeSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let origin = format!("file://{}", path.display());
        Self { path, origin }
    }
}

#[async_trait]
impl NodeSource for FileNodeSource {
    async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError> {
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let envelope: NodesEnvelope = serde_json::from_slice(&body)?;
        Ok(envelope.into_nodes())
    }

    async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError> {
        Ok(None)
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
