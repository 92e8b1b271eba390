//! Typed schema for the Ray dashboard payloads.
//!
//! Payloads are decoded once at the fetch boundary. Every nesting level is an
//! explicit optional field decoded tolerantly: a level that is missing or has
//! an unexpected shape becomes `None` instead of a decoding error, so a
//! deviating payload resolves to an empty node list. Inside the list each
//! node is decoded on its own, so one odd record never hides its siblings.

use ahash::AHashMap as HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Resource counter name for CPU cores.
pub const RESOURCE_CPU: &str = "CPU";
/// Resource counter name for memory bytes.
pub const RESOURCE_MEMORY: &str = "memory";
/// Resource counter name for GPU devices.
pub const RESOURCE_GPU: &str = "GPU";
/// Resource counter name for object-store bytes.
pub const RESOURCE_OBJECT_STORE: &str = "object_store_memory";
/// Marker resource set on nodes with a wired uplink.
pub const RESOURCE_WIRED: &str = "Wired";
/// Marker resource set on nodes with a wireless uplink.
pub const RESOURCE_WIRELESS: &str = "Wireless";

/// Node state reported by Ray for a live node.
pub const STATE_ALIVE: &str = "ALIVE";

/// Decodes any JSON value and maps a shape mismatch to `None`.
fn tolerant<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Top-level body of `GET /api/v0/nodes`.
#[derive(Debug, Default, Deserialize)]
pub struct NodesEnvelope {
    #[serde(default, deserialize_with = "tolerant")]
    pub data: Option<NodesData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodesData {
    #[serde(default, deserialize_with = "tolerant")]
    pub result: Option<NodesPage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodesPage {
    #[serde(default, deserialize_with = "tolerant")]
    pub result: Option<Vec<Value>>,
}

impl NodesEnvelope {
    /// Consumes the envelope and returns the node list found at
    /// `data.result.result`, or an empty list when any level is absent.
    /// List entries that are not objects are skipped on their own.
    pub fn into_nodes(self) -> Vec<RawNode> {
        self.data
            .and_then(|d| d.result)
            .and_then(|p| p.result)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Value::Object(raw) => Some(RawNode::from(raw)),
                other => {
                    warn!("Skipping node entry {} that is not an object: {}", index, other);
                    None
                }
            })
            .collect()
    }
}

/// Named capacity counters of a node, in upstream key order.
///
/// Values are kept as raw JSON so opaque extra keys survive the echo
/// unchanged; numeric accessors treat non-numbers as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTotals(pub Map<String, Value>);

impl ResourceTotals {
    /// Returns the numeric value of a counter, if present and numeric.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Returns the numeric value of a counter or 0.
    pub fn value(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    /// Iterates over counter names in upstream order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sets a numeric counter, appending it when new.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), Value::from(value));
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ResourceTotals {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut totals = ResourceTotals::default();
        for (key, value) in iter {
            totals.insert(key, value);
        }
        totals
    }
}

/// Node record as returned by the dashboard.
///
/// The typed fields are a lenient view over `raw`: a field that is missing or
/// has an unexpected type falls back to its default instead of failing the
/// node. `raw` is the untouched upstream object and is what gets echoed, so
/// the echo keeps every key, explicit nulls and the upstream key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    pub node_id: String,
    pub node_ip: Option<String>,
    pub state: Option<String>,
    pub state_message: Option<String>,
    pub is_head_node: bool,
    pub resources_total: ResourceTotals,
    pub raw: Map<String, Value>,
}

impl RawNode {
    pub fn is_alive(&self) -> bool {
        self.state.as_deref() == Some(STATE_ALIVE)
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

impl From<Map<String, Value>> for RawNode {
    fn from(raw: Map<String, Value>) -> Self {
        let resources_total = match raw.get("resources_total") {
            Some(Value::Object(totals)) => ResourceTotals(totals.clone()),
            _ => ResourceTotals::default(),
        };
        RawNode {
            node_id: string_field(&raw, "node_id").unwrap_or_default(),
            node_ip: string_field(&raw, "node_ip"),
            state: string_field(&raw, "state"),
            state_message: string_field(&raw, "state_message"),
            is_head_node: raw
                .get("is_head_node")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            resources_total,
            raw,
        }
    }
}

impl Serialize for RawNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(RawNode::from)
    }
}

/// Cluster-wide capacity: what exists and what is currently free.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterResources {
    pub total: HashMap<String, f64>,
    pub available: HashMap<String, f64>,
}

impl ClusterResources {
    /// Builds totals from the `usage` report of `/api/cluster_status`,
    /// where every resource maps to `[used, total]`.
    pub fn from_usage(usage: &HashMap<String, (f64, f64)>) -> Self {
        let mut resources = ClusterResources::default();
        for (name, (used, total)) in usage {
            resources.total.insert(name.clone(), *total);
            resources.available.insert(name.clone(), total - used);
        }
        resources
    }

    /// Sums the counters of all live nodes. Without a usage report nothing
    /// is known to be in use, so available equals total.
    pub fn from_alive_nodes(nodes: &[RawNode]) -> Self {
        let mut total: HashMap<String, f64> = HashMap::new();
        for node in nodes.iter().filter(|n| n.is_alive()) {
            for key in node.resources_total.keys() {
                if let Some(v) = node.resources_total.get(key) {
                    *total.entry(key.to_string()).or_insert(0.0) += v;
                }
            }
        }
        ClusterResources {
            available: total.clone(),
            total,
        }
    }
}

/// Top-level body of `GET /api/cluster_status`.
#[derive(Debug, Default, Deserialize)]
pub struct ClusterStatusEnvelope {
    #[serde(default, deserialize_with = "tolerant")]
    pub data: Option<ClusterStatusData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatusData {
    #[serde(default, deserialize_with = "tolerant")]
    pub cluster_status: Option<ClusterStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, deserialize_with = "tolerant")]
    pub load_metrics_report: Option<LoadMetricsReport>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoadMetricsReport {
    #[serde(default)]
    pub usage: Map<String, Value>,
}

impl ClusterStatusEnvelope {
    /// Extracts cluster resources from the usage report. Entries that are
    /// not `[used, total]` number pairs are skipped; an absent or empty
    /// report yields `None`.
    pub fn into_resources(self) -> Option<ClusterResources> {
        let report = self
            .data
            .and_then(|d| d.cluster_status)
            .and_then(|s| s.load_metrics_report)?;

        let usage: HashMap<String, (f64, f64)> = report
            .usage
            .iter()
            .filter_map(|(name, pair)| {
                let pair = pair.as_array()?;
                let used = pair.first()?.as_f64()?;
                let total = pair.get(1)?.as_f64()?;
                Some((name.clone(), (used, total)))
            })
            .collect();

        if usage.is_empty() {
            None
        } else {
            Some(ClusterResources::from_usage(&usage))
        }
    }
}
