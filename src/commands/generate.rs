//! Generate testdata command implementation.
//!
//! Generates a synthetic `/api/v0/nodes` payload that `--test-data-file`
//! can replay, so the monitor can run without a Ray cluster.

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::model::{
    ResourceTotals, RESOURCE_CPU, RESOURCE_GPU, RESOURCE_MEMORY, RESOURCE_OBJECT_STORE,
    RESOURCE_WIRED, RESOURCE_WIRELESS, STATE_ALIVE,
};

const GIB: f64 = (1u64 << 30) as f64;
const CPU_CHOICES: [f64; 4] = [4.0, 8.0, 16.0, 32.0];
const GPU_CHOICES: [f64; 3] = [1.0, 2.0, 4.0];

/// Generates the payload and writes it as pretty-printed JSON.
pub fn command_generate_testdata(
    output: PathBuf,
    nodes: usize,
    gpu_nodes: usize,
) -> anyhow::Result<()> {
    debug!(
        "Generating test data: nodes={}, gpu_nodes={}, output={}",
        nodes,
        gpu_nodes,
        output.display()
    );

    let mut rng = rand::thread_rng();
    let generated: Vec<Value> = (0..nodes)
        .map(|i| generate_random_node(&mut rng, i, i >= nodes.saturating_sub(gpu_nodes)))
        .collect();

    let payload = nodes_payload(generated);
    let json_content = serde_json::to_string_pretty(&payload)?;
    fs::write(&output, &json_content)?;

    println!(
        "✅ Generated test data: {} nodes in {}",
        nodes,
        output.display()
    );

    Ok(())
}

/// Wraps node records the way the dashboard nests them.
fn nodes_payload(nodes: Vec<Value>) -> Value {
    let count = nodes.len();
    json!({
        "result": true,
        "msg": format!("generated at {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ")),
        "data": {
            "result": {
                "total": count,
                "num_after_truncation": count,
                "num_filtered": count,
                "result": nodes,
            }
        }
    })
}

/// Generates one node. Index 0 is the head node; GPU nodes take the tail.
fn generate_random_node(rng: &mut impl Rng, index: usize, with_gpu: bool) -> Value {
    let is_head_node = index == 0;
    let ip = format!("10.30.2.{}", 11 + index);
    let node_id: String = (0..56)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();

    let cpu = CPU_CHOICES[rng.gen_range(0..CPU_CHOICES.len())];
    let memory_gib = rng.gen_range(8..=64) as f64;
    // Ray reserves about 30% of memory for the object store by default.
    let object_store = (memory_gib * 0.3 * GIB).round();

    let mut resources = ResourceTotals::default();
    resources.insert(RESOURCE_CPU, cpu);
    resources.insert(RESOURCE_MEMORY, memory_gib * GIB);
    resources.insert(RESOURCE_OBJECT_STORE, object_store);
    resources.insert(format!("node:{ip}"), 1.0);
    if is_head_node {
        resources.insert("node:__internal_head__", 1.0);
    }
    if with_gpu {
        resources.insert(RESOURCE_GPU, GPU_CHOICES[rng.gen_range(0..GPU_CHOICES.len())]);
        resources.insert("accelerator_type:G", 1.0);
    }
    if rng.gen_bool(0.7) {
        resources.insert(RESOURCE_WIRED, 1.0);
    } else {
        resources.insert(RESOURCE_WIRELESS, 1.0);
    }
    let identifier = if is_head_node {
        "head".to_string()
    } else {
        format!("worker-{index:02}")
    };
    resources.insert(identifier, 1.0);

    // Workers occasionally drop out; the head node always stays up.
    let alive = is_head_node || rng.gen_bool(0.85);
    let (state, state_message) = if alive {
        (STATE_ALIVE.to_string(), None)
    } else {
        (
            "DEAD".to_string(),
            Some("Unexpected termination: health check failed".to_string()),
        )
    };

    json!({
        "node_id": node_id,
        "node_ip": ip,
        "node_name": ip,
        "state": state,
        "state_message": state_message,
        "is_head_node": is_head_node,
        "resources_total": resources,
    })
}
