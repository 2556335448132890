pub mod theme;
pub mod types;

pub use theme::ColorClass;
pub use types::{CallGraph, GraphEdge, GraphNode, GroupMetrics};
