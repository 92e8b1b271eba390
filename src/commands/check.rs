//! Check command implementation.
//!
//! Probes the node source and reports whether a snapshot could be built.

use tracing::debug;

use crate::client::NodeSource;
use crate::model::ClusterResources;

/// Runs the checks and returns whether all mandatory ones passed.
pub async fn command_check(source: &dyn NodeSource) -> bool {
    println!("🔍 Ray Cluster Monitor - Dashboard Check");
    println!("========================================");
    println!("\n🌐 Source: {}", source.origin());

    let mut all_ok = true;

    println!("\n📋 Checking node list...");
    let nodes = match source.fetch_nodes().await {
        Ok(nodes) => {
            let alive = nodes.iter().filter(|n| n.is_alive()).count();
            let heads = nodes.iter().filter(|n| n.is_head_node).count();
            println!(
                "   ✅ {} nodes ({} alive, {} head)",
                nodes.len(),
                alive,
                heads
            );
            if heads == 0 && !nodes.is_empty() {
                println!("   ⚠️  No head node reported");
            }
            nodes
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
            Vec::new()
        }
    };

    // Cluster totals have a fallback, so this check never fails the run.
    println!("\n📊 Checking cluster usage report...");
    match source.fetch_cluster_resources().await {
        Ok(Some(resources)) => {
            println!(
                "   ✅ Usage report with {} resources",
                resources.total.len()
            );
        }
        Ok(None) => {
            let derived = ClusterResources::from_alive_nodes(&nodes);
            println!(
                "   ⚠️  No usage report; totals derived from {} live-node resources",
                derived.total.len()
            );
        }
        Err(e) => {
            println!("   ⚠️  Usage report unavailable: {}", e);
        }
    }

    debug!("Check finished, all_ok={}", all_ok);
    if all_ok {
        println!("\n✅ All checks passed");
    } else {
        println!("\n❌ Some checks failed");
    }
    all_ok
}
