//! Call-tree aggregation for per-request execution traces.
//!
//! ```text
//!   trace JSON ──▶ parsers::normalize ──▶ CallTree ──▶ graph::build_call_graph ──▶ CallGraph
//!                  (aliases, units)        (arena)      (metrics, grouping,          (nodes, edges,
//!                                                        threshold, edges, levels)    levels)
//! ```

pub mod graph;
pub mod model;
pub mod parsers;

pub use graph::{GraphConfig, Metric, build_call_graph};
pub use model::{CallNode, CallTree, FunctionType};
pub use parsers::{NormalizeOptions, parse_trace};
