//! Cluster-wide resource summary.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{RESOURCE_CPU, RESOURCE_GPU, RESOURCE_MEMORY, RESOURCE_OBJECT_STORE};
use crate::transform::{DisplayNode, NodeStatus};
use crate::usage::round_to;

const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

/// Totals for a counted resource (CPU cores, GPUs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub total: f64,
    pub used: f64,
    pub available: f64,
    pub usage_percent: f64,
}

/// Totals for a byte-sized resource, with gigabyte views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteResourceUsage {
    pub total: f64,
    pub used: f64,
    pub available: f64,
    pub usage_percent: f64,
    #[serde(rename = "totalGB")]
    pub total_gb: f64,
    #[serde(rename = "usedGB")]
    pub used_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResources {
    pub cpu: ResourceUsage,
    pub memory: ByteResourceUsage,
    pub gpu: ResourceUsage,
    pub object_store: ByteResourceUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub total_nodes: usize,
    pub alive_nodes: usize,
    pub dead_nodes: usize,
    pub head_nodes: usize,
    pub resources: SummaryResources,
}

/// `used / total` in percent with one decimal; 0 when there is no capacity.
pub fn usage_percent(used: f64, total: f64) -> f64 {
    if total > 0.0 {
        round_to(used / total * 100.0, 1)
    } else {
        0.0
    }
}

fn resource_usage(
    name: &str,
    totals: &HashMap<String, f64>,
    available: &HashMap<String, f64>,
) -> ResourceUsage {
    let total = totals.get(name).copied().unwrap_or(0.0);
    let available = available.get(name).copied().unwrap_or(0.0);
    let used = total - available;
    ResourceUsage {
        total,
        used,
        available,
        usage_percent: usage_percent(used, total),
    }
}

fn byte_resource_usage(
    name: &str,
    totals: &HashMap<String, f64>,
    available: &HashMap<String, f64>,
) -> ByteResourceUsage {
    let usage = resource_usage(name, totals, available);
    ByteResourceUsage {
        total_gb: round_to(usage.total / BYTES_PER_GB, 2),
        used_gb: round_to(usage.used / BYTES_PER_GB, 2),
        total: usage.total,
        used: usage.used,
        available: usage.available,
        usage_percent: usage.usage_percent,
    }
}

pub fn summarize(
    cluster_totals: &HashMap<String, f64>,
    available_totals: &HashMap<String, f64>,
    nodes: &[DisplayNode],
) -> ClusterSummary {
    ClusterSummary {
        total_nodes: nodes.len(),
        alive_nodes: nodes.iter().filter(|n| n.status == NodeStatus::Active).count(),
        dead_nodes: nodes.iter().filter(|n| n.status == NodeStatus::Dead).count(),
        head_nodes: nodes.iter().filter(|n| n.is_head_node).count(),
        resources: SummaryResources {
            cpu: resource_usage(RESOURCE_CPU, cluster_totals, available_totals),
            memory: byte_resource_usage(RESOURCE_MEMORY, cluster_totals, available_totals),
            gpu: resource_usage(RESOURCE_GPU, cluster_totals, available_totals),
            object_store: byte_resource_usage(
                RESOURCE_OBJECT_STORE,
                cluster_totals,
                available_totals,
            ),
        },
    }
}
