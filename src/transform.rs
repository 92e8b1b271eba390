//! Reshapes raw Ray node records into the frontend display format.

use serde::{Deserialize, Serialize};

use crate::model::{
    RawNode, ResourceTotals, RESOURCE_CPU, RESOURCE_GPU, RESOURCE_MEMORY, RESOURCE_OBJECT_STORE,
    RESOURCE_WIRED, RESOURCE_WIRELESS,
};
use crate::usage::{NodeUsage, UsageSource};

/// Resource keys that never name a node.
const STANDARD_RESOURCE_KEYS: [&str; 7] = [
    RESOURCE_CPU,
    RESOURCE_MEMORY,
    RESOURCE_GPU,
    RESOURCE_OBJECT_STORE,
    "accelerator_type:G",
    RESOURCE_WIRED,
    RESOURCE_WIRELESS,
];

/// Ray adds one `node:<ip>` resource per node.
const NODE_RESOURCE_PREFIX: &str = "node:";

const SHORT_ID_LEN: usize = 8;
const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

pub const TASK_CPU_INTENSIVE: &str = "CPU密集任务";
pub const TASK_MEMORY_INTENSIVE: &str = "内存密集任务";
pub const TASK_GPU_COMPUTE: &str = "GPU计算任务";
pub const TASK_CLUSTER_MANAGEMENT: &str = "集群管理";
pub const TASK_IDLE: &str = "空闲";

const CPU_TASK_THRESHOLD: f64 = 50.0;
const MEMORY_TASK_THRESHOLD: f64 = 60.0;
const GPU_TASK_THRESHOLD: f64 = 40.0;

const UNKNOWN_IP: &str = "Unknown";
const UNKNOWN_IDENTIFIER: &str = "未知";
const UNKNOWN_STATE: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wired,
    Wireless,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Dead,
}

/// Per-node capacity converted to display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResources {
    pub total_cpu: f64,
    /// Whole gigabytes.
    pub total_memory: u64,
    pub total_gpu: f64,
    /// Whole gigabytes.
    pub object_store: u64,
}

/// Node record shaped for the dashboard frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNode {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub node_ip: String,
    pub node_id: String,
    pub state: String,
    pub is_head_node: bool,
    pub cpu: f64,
    pub memory: f64,
    pub gpu: f64,
    pub usage_simulated: bool,
    pub tasks: Vec<String>,
    pub status: NodeStatus,
    pub state_message: Option<String>,
    pub connection_type: ConnectionType,
    pub resources: NodeResources,
}

/// Returns the first resource key that is neither a standard counter nor a
/// `node:` marker. Operators tag nodes with such a custom resource.
pub fn extract_node_identifier(resources: &ResourceTotals) -> Option<&str> {
    resources
        .keys()
        .find(|key| !STANDARD_RESOURCE_KEYS.contains(key) && !key.starts_with(NODE_RESOURCE_PREFIX))
}

pub fn connection_type(resources: &ResourceTotals) -> ConnectionType {
    if resources.get(RESOURCE_WIRED) == Some(1.0) {
        ConnectionType::Wired
    } else if resources.get(RESOURCE_WIRELESS) == Some(1.0) {
        ConnectionType::Wireless
    } else {
        ConnectionType::Unknown
    }
}

/// Labels describing what a node is busy with. Thresholds are strict.
pub fn node_tasks(usage: &NodeUsage, is_head_node: bool) -> Vec<String> {
    let mut tasks = Vec::new();
    if usage.cpu > CPU_TASK_THRESHOLD {
        tasks.push(TASK_CPU_INTENSIVE.to_string());
    }
    if usage.memory > MEMORY_TASK_THRESHOLD {
        tasks.push(TASK_MEMORY_INTENSIVE.to_string());
    }
    if usage.gpu > GPU_TASK_THRESHOLD {
        tasks.push(TASK_GPU_COMPUTE.to_string());
    }
    if is_head_node {
        tasks.push(TASK_CLUSTER_MANAGEMENT.to_string());
    }
    if tasks.is_empty() {
        tasks.push(TASK_IDLE.to_string());
    }
    tasks
}

/// Last eight characters of the node id; ids shorter than that give "".
pub fn short_id(node_id: &str) -> String {
    let count = node_id.chars().count();
    if count < SHORT_ID_LEN {
        return String::new();
    }
    node_id.chars().skip(count - SHORT_ID_LEN).collect()
}

fn bytes_to_whole_gb(bytes: f64) -> u64 {
    (bytes / BYTES_PER_GB).round_ties_even().max(0.0) as u64
}

pub fn transform(node: &RawNode, usage_source: &dyn UsageSource) -> DisplayNode {
    let resources = &node.resources_total;
    let identifier = extract_node_identifier(resources);
    let ip = node.node_ip.as_deref().unwrap_or(UNKNOWN_IP);
    let usage = usage_source.usage_for(node);

    DisplayNode {
        id: short_id(&node.node_id),
        name: identifier
            .map(str::to_string)
            .unwrap_or_else(|| format!("节点-{ip}")),
        full_name: format!("{} ({ip})", identifier.unwrap_or(UNKNOWN_IDENTIFIER)),
        node_ip: ip.to_string(),
        node_id: node.node_id.clone(),
        state: node
            .state
            .clone()
            .unwrap_or_else(|| UNKNOWN_STATE.to_string()),
        is_head_node: node.is_head_node,
        cpu: usage.cpu,
        memory: usage.memory,
        gpu: usage.gpu,
        usage_simulated: usage_source.is_simulated(),
        tasks: node_tasks(&usage, node.is_head_node),
        status: if node.is_alive() {
            NodeStatus::Active
        } else {
            NodeStatus::Dead
        },
        state_message: node.state_message.clone(),
        connection_type: connection_type(resources),
        resources: NodeResources {
            total_cpu: resources.value(RESOURCE_CPU),
            total_memory: bytes_to_whole_gb(resources.value(RESOURCE_MEMORY)),
            total_gpu: resources.value(RESOURCE_GPU),
            object_store: bytes_to_whole_gb(resources.value(RESOURCE_OBJECT_STORE)),
        },
    }
}
