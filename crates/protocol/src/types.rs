use serde::{Deserialize, Serialize};

use crate::theme::ColorClass;

/// Self (exclusive) metric totals accumulated for one group.
///
/// Every field is a sum of per-call self values, so a group that contains
/// both a function and its own callees never counts the callees twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetrics {
    /// Raw recorded duration, in seconds.
    pub duration: f64,
    /// Wall time in seconds (falls back to duration per call).
    pub wall_time: f64,
    /// CPU time in seconds (falls back to duration per call).
    pub cpu_time: f64,
    /// I/O wait in seconds.
    pub io_wait_time: f64,
    /// Absolute self memory delta in bytes.
    pub memory_delta: f64,
    /// Bytes sent plus bytes received.
    pub network_bytes: f64,
}

impl std::ops::AddAssign for GroupMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.duration += rhs.duration;
        self.wall_time += rhs.wall_time;
        self.cpu_time += rhs.cpu_time;
        self.io_wait_time += rhs.io_wait_time;
        self.memory_delta += rhs.memory_delta;
        self.network_bytes += rhs.network_bytes;
    }
}

/// One visible unit of the dependency graph: a class, file or function group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Group key. Unique within a graph.
    pub id: String,
    pub label: String,
    pub class_name: Option<String>,
    pub file_name: Option<String>,
    /// Most significant method of the group, if it has any.
    pub dominant_method: Option<String>,
    pub method_count: usize,
    /// Total number of calls folded into this group.
    pub call_count: u64,
    pub metrics: GroupMetrics,
    /// Value of the selected metric for this group.
    pub value: f64,
    /// Share of the selected metric across the visible nodes, 0..=100.
    pub percentage: f64,
    /// Layer index for layered layouts (0 = top).
    pub level: u32,
    #[serde(rename = "colorClass")]
    pub color: ColorClass,
    /// Display diameter in logical pixels.
    pub size: f64,
    pub is_root: bool,
}

/// A deduplicated call relationship between two visible groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// How many times this caller/callee pair occurs in the call tree.
    pub weight: u32,
    /// `"Nx"` when the pair occurs more than once.
    pub label: Option<String>,
    /// Stroke width in logical pixels.
    pub width: f64,
}

/// The graph handed to layout/rendering consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl CallGraph {
    /// Whether there is nothing to show ("no data" state).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }
}
