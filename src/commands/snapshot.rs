//! Snapshot command implementation.
//!
//! Runs a single refresh cycle and prints the JSON a client would receive.

use anyhow::bail;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::client::NodeSource;
use crate::refresh::run_cycle;
use crate::usage::UsageSource;

pub async fn command_snapshot(
    source: Arc<dyn NodeSource>,
    usage: Arc<dyn UsageSource>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    debug!("Running one refresh cycle against {}", source.origin());

    let snapshot = run_cycle(source, usage).await;
    let json = serde_json::to_string_pretty(&snapshot)?;

    match &output {
        Some(path) => {
            fs::write(path, &json)?;
            println!(
                "✅ Wrote snapshot with {} nodes to {}",
                snapshot.node_count(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    if !snapshot.result {
        bail!("{}", snapshot.msg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FileNodeSource;
    use crate::usage::SimulatedUsage;
    use serde_json::Value;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_snapshot_written_to_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("nodes.json");
        fs::write(
            &input,
            r#"{"data": {"result": {"result": [
                {"node_id": "0123456789abcdef", "node_ip": "10.0.0.1", "state": "ALIVE",
                 "is_head_node": true, "resources_total": {"CPU": 2.0}}
            ]}}}"#,
        )
        .unwrap();
        let output = dir.path().join("snapshot.json");

        command_snapshot(
            Arc::new(FileNodeSource::new(&input)),
            Arc::new(SimulatedUsage),
            Some(output.clone()),
        )
        .await
        .unwrap();

        let v: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(v["result"], true);
        assert_eq!(v["data"]["nodes"][0]["id"], "89abcdef");
        assert_eq!(v["data"]["nodes"][0]["usageSimulated"], true);
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_an_error() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("snapshot.json");
        let err = command_snapshot(
            Arc::new(FileNodeSource::new(dir.path().join("missing.json"))),
            Arc::new(SimulatedUsage),
            Some(output.clone()),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("错误: "));
        // The failure snapshot is still written for inspection.
        let v: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(v["result"], false);
    }
}
