//! Periodic refresh of the snapshot cache.
//!
//! One cycle fetches nodes and cluster capacity, reshapes them and installs
//! the resulting [`Snapshot`]. Fetch, transform and aggregation run without
//! touching the cache; only the final install takes the lock.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{FetchError, NodeSource};
use crate::model::ClusterResources;
use crate::snapshot::{RawNodeEcho, Snapshot, SnapshotData};
use crate::state::SharedState;
use crate::summary::summarize;
use crate::transform::{transform, DisplayNode};
use crate::usage::UsageSource;

/// Pause between the end of one cycle and the start of the next.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Runs the fetch, transform and aggregate steps of one cycle.
pub async fn build_snapshot(
    source: &dyn NodeSource,
    usage: &dyn UsageSource,
) -> Result<Snapshot, FetchError> {
    let nodes = source.fetch_nodes().await?;
    debug!("Fetched {} raw nodes from {}", nodes.len(), source.origin());

    let cluster = match source.fetch_cluster_resources().await {
        Ok(Some(resources)) => resources,
        Ok(None) => {
            debug!("No cluster usage report, deriving totals from live nodes");
            ClusterResources::from_alive_nodes(&nodes)
        }
        Err(e) => {
            warn!("Cluster status unavailable ({}), deriving totals from live nodes", e);
            ClusterResources::from_alive_nodes(&nodes)
        }
    };

    let display: Vec<DisplayNode> = nodes.iter().map(|n| transform(n, usage)).collect();
    let summary = summarize(&cluster.total, &cluster.available, &display);

    Ok(Snapshot::success(SnapshotData {
        result: RawNodeEcho::new(nodes),
        summary,
        nodes: display,
        dashboard_url: source.origin().to_string(),
    }))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "refresh cycle panicked".to_string()
    }
}

/// Runs one cycle in its own task and folds every failure, including a
/// panic, into a failure snapshot.
pub async fn run_cycle(source: Arc<dyn NodeSource>, usage: Arc<dyn UsageSource>) -> Snapshot {
    let task = tokio::spawn(async move { build_snapshot(source.as_ref(), usage.as_ref()).await });

    match task.await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => Snapshot::failure(e),
        Err(join_error) if join_error.is_panic() => {
            Snapshot::failure(panic_message(join_error.into_panic()))
        }
        Err(join_error) => Snapshot::failure(join_error),
    }
}

/// Runs one cycle and installs its outcome, replacing whatever was cached.
#[instrument(skip(state))]
pub async fn refresh_once(state: &SharedState) -> bool {
    let start = Instant::now();
    debug!("Starting refresh cycle");

    let snapshot = run_cycle(state.source.clone(), state.usage.clone()).await;
    let success = snapshot.result;
    let node_count = snapshot.node_count();
    let msg = snapshot.msg.clone();

    state
        .metrics
        .observe_refresh(&snapshot, start.elapsed().as_secs_f64());
    state.cache.set_snapshot(snapshot).await;

    if success {
        info!(
            "Refresh completed: {} nodes in {:.2}ms",
            node_count,
            start.elapsed().as_secs_f64() * 1000.0
        );
    } else {
        error!("Refresh failed: {}", msg);
    }
    success
}

/// Background refresh loop that can be stopped from its owner.
pub struct RefreshTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Spawns the loop. The first cycle runs one `interval` after spawning;
    /// callers perform the initial refresh themselves.
    pub fn spawn(state: SharedState, interval: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            debug!(
                "Background refresh task started with {}s interval",
                interval.as_secs()
            );
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    // Fires on shutdown and when the owner is dropped.
                    _ = stop.changed() => break,
                }
                refresh_once(&state).await;
            }
            debug!("Background refresh task stopped");
        });

        Self { shutdown, handle }
    }

    /// Stops the loop after the cycle in progress, if any, and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!("Refresh task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{RawNode, ResourceTotals};
    use crate::state::AppState;
    use crate::transform::tests::FixedUsage;
    use crate::usage::NodeUsage;
    use ahash::AHashMap as HashMap;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted source: hands out queued node results, then repeats the last.
    struct ScriptedSource {
        nodes: Mutex<Vec<Result<Vec<RawNode>, FetchError>>>,
        cluster: Option<ClusterResources>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<RawNode>, FetchError>>) -> Self {
            Self {
                nodes: Mutex::new(script),
                cluster: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NodeSource for ScriptedSource {
        async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.nodes.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                match script.first() {
                    Some(Ok(nodes)) => Ok(nodes.clone()),
                    _ => Err(FetchError::Status(StatusCode::BAD_GATEWAY)),
                }
            }
        }

        async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError> {
            Ok(self.cluster.clone())
        }

        fn origin(&self) -> &str {
            "http://ray-head:8265"
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl NodeSource for PanickingSource {
        async fn fetch_nodes(&self) -> Result<Vec<RawNode>, FetchError> {
            panic!("upstream payload exploded");
        }

        async fn fetch_cluster_resources(&self) -> Result<Option<ClusterResources>, FetchError> {
            Ok(None)
        }

        fn origin(&self) -> &str {
            "panic://"
        }
    }

    fn node(id: &str, head: bool, resources: &[(&str, f64)]) -> RawNode {
        RawNode {
            node_id: id.to_string(),
            node_ip: Some("10.30.2.11".into()),
            state: Some("ALIVE".into()),
            is_head_node: head,
            resources_total: resources.iter().copied().collect::<ResourceTotals>(),
            ..Default::default()
        }
    }

    fn fixed_usage() -> Arc<dyn UsageSource> {
        Arc::new(FixedUsage(NodeUsage {
            cpu: 40.0,
            memory: 40.0,
            gpu: 0.0,
        }))
    }

    fn state_with(source: Arc<dyn NodeSource>) -> SharedState {
        AppState::new(Config::default(), source, fixed_usage()).unwrap()
    }

    fn two_nodes() -> Vec<RawNode> {
        vec![
            node("head0000head0000", true, &[("CPU", 8.0), ("memory", 17179869184.0)]),
            node(
                "work0000work0000",
                false,
                &[("CPU", 8.0), ("GPU", 4.0), ("memory", 17179869184.0)],
            ),
        ]
    }

    #[tokio::test]
    async fn test_build_snapshot_uses_cluster_report() {
        let mut source = ScriptedSource::new(vec![Ok(two_nodes())]);
        let total: HashMap<String, f64> = [
            ("CPU".to_string(), 16.0),
            ("memory".to_string(), 34359738368.0),
        ]
        .into_iter()
        .collect();
        let available: HashMap<String, f64> = [
            ("CPU".to_string(), 8.0),
            ("memory".to_string(), 17179869184.0),
        ]
        .into_iter()
        .collect();
        source.cluster = Some(ClusterResources { total, available });

        let usage = fixed_usage();
        let snapshot = build_snapshot(&source, usage.as_ref()).await.unwrap();
        let data = snapshot.data.unwrap();
        assert!(snapshot.result);
        assert_eq!(data.summary.resources.cpu.usage_percent, 50.0);
        assert_eq!(data.summary.resources.memory.used_gb, 16.0);
        assert_eq!(data.summary.head_nodes, 1);
        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.result.total, 2);
        assert_eq!(data.dashboard_url, "http://ray-head:8265");
    }

    #[tokio::test]
    async fn test_build_snapshot_derives_totals_without_report() {
        let source = ScriptedSource::new(vec![Ok(two_nodes())]);
        let usage = fixed_usage();
        let snapshot = build_snapshot(&source, usage.as_ref()).await.unwrap();
        let cpu = &snapshot.data.unwrap().summary.resources.cpu;
        assert_eq!(cpu.total, 16.0);
        assert_eq!(cpu.used, 0.0);
        assert_eq!(cpu.usage_percent, 0.0);
    }

    #[tokio::test]
    async fn test_run_cycle_converts_errors_and_panics() {
        let failing: Arc<dyn NodeSource> = Arc::new(ScriptedSource::new(vec![Err(
            FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR),
        )]));
        let snapshot = run_cycle(failing, fixed_usage()).await;
        assert!(!snapshot.result);
        assert!(snapshot.msg.starts_with("错误: "));
        assert!(snapshot.msg.contains("500"));

        let snapshot = run_cycle(Arc::new(PanickingSource), fixed_usage()).await;
        assert!(!snapshot.result);
        assert_eq!(snapshot.msg, "错误: upstream payload exploded");
        assert!(snapshot.data.is_none());
    }

    #[tokio::test]
    async fn test_failed_cycle_replaces_good_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(two_nodes()),
            Err(FetchError::Timeout),
        ]));
        let state = state_with(source);

        assert!(refresh_once(&state).await);
        assert_eq!(state.cache.get_snapshot().await.unwrap().node_count(), 2);

        assert!(!refresh_once(&state).await);
        let current = state.cache.get_snapshot().await.unwrap();
        assert!(!current.result);
        assert!(current.data.is_none());
        assert_eq!(state.metrics.refresh_cycles.get(), 2);
        assert_eq!(state.metrics.refresh_success.get(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_task_runs_on_interval_and_stops() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(two_nodes())]));
        let state = state_with(source.clone());

        let task = RefreshTask::spawn(state.clone(), REFRESH_INTERVAL);
        assert!(state.cache.get_snapshot().await.is_none());

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(state.cache.get_snapshot().await.unwrap().result);

        task.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_task_survives_panicking_cycles() {
        let state = state_with(Arc::new(PanickingSource));
        let task = RefreshTask::spawn(state.clone(), REFRESH_INTERVAL);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(state.metrics.refresh_cycles.get(), 2);
        assert!(!state.cache.get_snapshot().await.unwrap().result);

        task.shutdown().await;
    }
}
