use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracegraph_protocol::GroupMetrics;

use crate::model::{CallNode, CallTree};

/// Metric dimension a graph is ranked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    #[serde(alias = "duration")]
    WallTime,
    IoWait,
    Cpu,
    Memory,
    Network,
}

#[derive(Debug, Error)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::WallTime,
        Metric::IoWait,
        Metric::Cpu,
        Metric::Memory,
        Metric::Network,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::WallTime => "wall_time",
            Self::IoWait => "io_wait",
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Network => "network",
        }
    }

    /// Wall time and CPU fall back to duration, so a zero total still
    /// describes a real (if instant) group.
    pub fn tolerates_zero(self) -> bool {
        matches!(self, Self::WallTime | Self::Cpu)
    }

    /// Read this dimension out of accumulated group totals.
    pub fn total(self, totals: &GroupMetrics) -> f64 {
        match self {
            Self::WallTime => totals.wall_time,
            Self::IoWait => totals.io_wait_time,
            Self::Cpu => totals.cpu_time,
            Self::Memory => totals.memory_delta,
            Self::Network => totals.network_bytes,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wall_time" | "wall" | "duration" => Ok(Self::WallTime),
            "io_wait" => Ok(Self::IoWait),
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "network" => Ok(Self::Network),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

/// Inclusive value of `node` for `metric`: the recorded figure, which
/// already contains everything its callees did.
pub fn inclusive(node: &CallNode, metric: Metric) -> f64 {
    match metric {
        Metric::WallTime => {
            if node.wall_time > 0.0 {
                node.wall_time
            } else {
                node.duration
            }
        }
        Metric::IoWait => node.io_wait_time,
        Metric::Cpu => {
            if node.cpu_time > 0.0 {
                node.cpu_time
            } else {
                node.duration
            }
        }
        Metric::Memory => (node.memory_delta as f64).abs(),
        Metric::Network => node.bytes_sent_delta as f64 + node.bytes_received_delta as f64,
    }
}

/// Exclusive value of the node at `idx`: its inclusive value minus its
/// direct children's inclusive values.
///
/// Floored at zero for every metric but memory. Memory subtracts signed
/// deltas first and only then takes the magnitude, so a call that frees more
/// than its callees allocated keeps its real contribution.
pub fn self_value(tree: &CallTree, idx: usize, metric: Metric) -> f64 {
    let Some(node) = tree.node(idx) else {
        return 0.0;
    };
    if metric == Metric::Memory {
        return (signed_self_memory(tree, idx) as f64).abs();
    }
    let children: f64 = tree.children(idx).map(|c| inclusive(c, metric)).sum();
    (inclusive(node, metric) - children).max(0.0)
}

/// Signed exclusive memory delta of the node at `idx`.
pub fn signed_self_memory(tree: &CallTree, idx: usize) -> i64 {
    let Some(node) = tree.node(idx) else {
        return 0;
    };
    let children = tree
        .children(idx)
        .fold(0i64, |acc, c| acc.saturating_add(c.memory_delta));
    node.memory_delta.saturating_sub(children)
}

/// Exclusive raw duration, floored at zero.
pub fn self_duration(tree: &CallTree, idx: usize) -> f64 {
    let Some(node) = tree.node(idx) else {
        return 0.0;
    };
    let children: f64 = tree.children(idx).map(|c| c.duration).sum();
    (node.duration - children).max(0.0)
}

/// Exclusive values of the node at `idx` across every dimension.
pub fn self_metrics(tree: &CallTree, idx: usize) -> GroupMetrics {
    GroupMetrics {
        duration: self_duration(tree, idx),
        wall_time: self_value(tree, idx, Metric::WallTime),
        cpu_time: self_value(tree, idx, Metric::Cpu),
        io_wait_time: self_value(tree, idx, Metric::IoWait),
        memory_delta: self_value(tree, idx, Metric::Memory),
        network_bytes: self_value(tree, idx, Metric::Network),
    }
}
