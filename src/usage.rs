//! Per-node usage figures.
//!
//! The Ray nodes API reports capacity, not utilisation. Until a real metrics
//! source is wired in, usage percentages are simulated: [`SimulatedUsage`]
//! draws uniform random values. Every display node carries
//! `usageSimulated` so consumers can tell the figures are synthetic.

use rand::Rng;

use crate::model::{RawNode, RESOURCE_GPU};

/// Usage percentages (0-100, one decimal) for a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUsage {
    pub cpu: f64,
    pub memory: f64,
    pub gpu: f64,
}

/// Source of per-node usage percentages.
pub trait UsageSource: Send + Sync {
    fn usage_for(&self, node: &RawNode) -> NodeUsage;

    /// Whether the figures are synthetic rather than measured.
    fn is_simulated(&self) -> bool;
}

/// Simulated CPU usage range in percent.
pub const CPU_RANGE: (f64, f64) = (20.0, 80.0);
/// Simulated memory usage range in percent.
pub const MEMORY_RANGE: (f64, f64) = (15.0, 75.0);
/// Simulated GPU usage range in percent, only for nodes with GPUs.
pub const GPU_RANGE: (f64, f64) = (10.0, 90.0);

/// Random usage generator; ranges are kept stable for frontend compatibility.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedUsage;

impl SimulatedUsage {
    fn sample(rng: &mut impl Rng, (min, max): (f64, f64)) -> f64 {
        round_to(rng.gen_range(min..=max), 1)
    }
}

impl UsageSource for SimulatedUsage {
    fn usage_for(&self, node: &RawNode) -> NodeUsage {
        let mut rng = rand::thread_rng();
        let cpu = Self::sample(&mut rng, CPU_RANGE);
        let memory = Self::sample(&mut rng, MEMORY_RANGE);
        let gpu = if node.resources_total.value(RESOURCE_GPU) > 0.0 {
            Self::sample(&mut rng, GPU_RANGE)
        } else {
            0.0
        };
        NodeUsage { cpu, memory, gpu }
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Rounds to `decimals` places, ties to even (2.5 becomes 2, 3.5 becomes 4).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
