//! Shared snapshot cache.
//!
//! This module provides the `SnapshotCache` container that holds the one
//! current [`Snapshot`]. The refresh loop installs new snapshots and the HTTP
//! handlers read them; both receive the same container at construction time.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::snapshot::Snapshot;

/// Single-slot cache for the latest refresh outcome.
///
/// Snapshots are immutable once installed. Readers clone the `Arc` and
/// writers swap it, so the lock is held only for a pointer copy and a reader
/// never sees fields from two different installs.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot, or `None` before the first refresh
    /// cycle has completed.
    pub async fn get_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Replaces the current snapshot, whatever its outcome.
    pub async fn set_snapshot(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot);
    }

    pub async fn is_ready(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unready_until_first_install() {
        let cache = SnapshotCache::new();
        assert!(!cache.is_ready().await);
        assert!(cache.get_snapshot().await.is_none());

        cache.set_snapshot(Snapshot::failure("boom")).await;
        assert!(cache.is_ready().await);
        assert_eq!(cache.get_snapshot().await.unwrap().msg, "错误: boom");
    }

    #[tokio::test]
    async fn test_failure_overwrites_success() {
        let cache = SnapshotCache::new();
        let mut ok = Snapshot::not_ready();
        ok.result = true;
        cache.set_snapshot(ok).await;
        assert!(cache.get_snapshot().await.unwrap().result);

        cache.set_snapshot(Snapshot::failure("upstream down")).await;
        let current = cache.get_snapshot().await.unwrap();
        assert!(!current.result);
        assert!(current.data.is_none());
    }

    #[tokio::test]
    async fn test_held_snapshot_survives_replacement() {
        let cache = SnapshotCache::new();
        cache.set_snapshot(Snapshot::failure("first")).await;
        let held = cache.get_snapshot().await.unwrap();
        cache.set_snapshot(Snapshot::failure("second")).await;
        assert_eq!(held.msg, "错误: first");
        assert_eq!(cache.get_snapshot().await.unwrap().msg, "错误: second");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_never_mix_installs() {
        let cache = Arc::new(SnapshotCache::new());

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    let mut s = Snapshot::failure(i);
                    // Both fields derive from the same install.
                    s.timestamp = format!("install-{i}");
                    cache.set_snapshot(s).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        if let Some(s) = cache.get_snapshot().await {
                            let id = s.msg.trim_start_matches("错误: ");
                            assert_eq!(s.timestamp, format!("install-{id}"));
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
    }
}
