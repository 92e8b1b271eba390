//! Prometheus metrics describing the monitor itself.
//!
//! The registry is always populated; it is only exposed over HTTP when
//! telemetry is enabled.

use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder};

use crate::snapshot::Snapshot;

/// Collection of Prometheus metrics for refresh and serving telemetry.
#[derive(Clone)]
pub struct MonitorMetrics {
    pub refresh_duration: Gauge,
    pub refresh_success: Gauge,
    pub refresh_cycles: IntCounter,
    pub nodes: GaugeVec,
    pub cluster_usage_percent: GaugeVec,
    pub http_requests: IntCounter,
}

impl MonitorMetrics {
    /// Creates and registers all metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let refresh_duration = Gauge::new(
            "ray_monitor_refresh_duration_seconds",
            "Time spent on the last refresh cycle",
        )?;
        let refresh_success = Gauge::new(
            "ray_monitor_refresh_success",
            "Whether the last refresh cycle was successful (1) or failed (0)",
        )?;
        let refresh_cycles = IntCounter::new(
            "ray_monitor_refresh_cycles_total",
            "Number of completed refresh cycles",
        )?;
        let nodes = GaugeVec::new(
            Opts::new("ray_monitor_nodes", "Nodes in the last snapshot by status"),
            &["status"],
        )?;
        let cluster_usage_percent = GaugeVec::new(
            Opts::new(
                "ray_monitor_cluster_usage_percent",
                "Cluster-wide usage of a resource in percent",
            ),
            &["resource"],
        )?;
        let http_requests = IntCounter::new(
            "ray_monitor_http_requests_total",
            "Number of HTTP requests served",
        )?;

        registry.register(Box::new(refresh_duration.clone()))?;
        registry.register(Box::new(refresh_success.clone()))?;
        registry.register(Box::new(refresh_cycles.clone()))?;
        registry.register(Box::new(nodes.clone()))?;
        registry.register(Box::new(cluster_usage_percent.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            refresh_duration,
            refresh_success,
            refresh_cycles,
            nodes,
            cluster_usage_percent,
            http_requests,
        })
    }

    /// Records the outcome of a refresh cycle.
    pub fn observe_refresh(&self, snapshot: &Snapshot, duration_seconds: f64) {
        self.refresh_cycles.inc();
        self.refresh_duration.set(duration_seconds);
        self.refresh_success
            .set(if snapshot.result { 1.0 } else { 0.0 });

        // A failed cycle leaves no data; stale per-node gauges would lie.
        self.nodes.reset();
        self.cluster_usage_percent.reset();

        if let Some(data) = &snapshot.data {
            let s = &data.summary;
            self.nodes.with_label_values(&["total"]).set(s.total_nodes as f64);
            self.nodes.with_label_values(&["alive"]).set(s.alive_nodes as f64);
            self.nodes.with_label_values(&["dead"]).set(s.dead_nodes as f64);
            self.nodes.with_label_values(&["head"]).set(s.head_nodes as f64);

            let r = &s.resources;
            for (resource, percent) in [
                ("cpu", r.cpu.usage_percent),
                ("memory", r.memory.usage_percent),
                ("gpu", r.gpu.usage_percent),
                ("object_store", r.object_store.usage_percent),
            ] {
                self.cluster_usage_percent
                    .with_label_values(&[resource])
                    .set(percent);
            }
        }
    }
}

/// Encodes every metric in the registry in Prometheus text format.
pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
