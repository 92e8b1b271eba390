//! The externally visible unit of cached state.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::model::RawNode;
use crate::summary::ClusterSummary;
use crate::transform::DisplayNode;

pub const MSG_SUCCESS: &str = "成功获取Ray集群信息";
pub const MSG_NOT_READY: &str = "数据尚未准备就绪";

/// Local time with microseconds, e.g. `2025-03-01T14:05:09.123456`.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Raw dashboard nodes echoed back in the dashboard's own paging format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNodeEcho {
    pub total: usize,
    pub num_after_truncation: usize,
    pub num_filtered: usize,
    pub result: Vec<RawNode>,
}

impl RawNodeEcho {
    pub fn new(nodes: Vec<RawNode>) -> Self {
        let count = nodes.len();
        Self {
            total: count,
            num_after_truncation: count,
            num_filtered: count,
            result: nodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub result: RawNodeEcho,
    pub summary: ClusterSummary,
    pub nodes: Vec<DisplayNode>,
    pub dashboard_url: String,
}

/// Outcome of one refresh cycle as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub result: bool,
    pub msg: String,
    pub timestamp: String,
    pub data: Option<SnapshotData>,
}

impl Snapshot {
    pub fn success(data: SnapshotData) -> Self {
        Self {
            result: true,
            msg: MSG_SUCCESS.to_string(),
            timestamp: now_timestamp(),
            data: Some(data),
        }
    }

    /// Failure snapshot carrying the cause of a broken refresh cycle.
    pub fn failure(cause: impl std::fmt::Display) -> Self {
        Self {
            result: false,
            msg: format!("错误: {cause}"),
            timestamp: now_timestamp(),
            data: None,
        }
    }

    /// Placeholder served before the first refresh cycle completes.
    pub fn not_ready() -> Self {
        Self {
            result: false,
            msg: MSG_NOT_READY.to_string(),
            timestamp: now_timestamp(),
            data: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.nodes.len())
    }
}
