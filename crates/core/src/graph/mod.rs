pub mod builder;
pub mod config;
pub mod grouper;
pub mod levels;
pub mod metrics;
pub mod threshold;

pub use config::{ConfigError, FallbackPolicy, GraphConfig, Visibility};
pub use metrics::Metric;

use tracegraph_protocol::CallGraph;

use crate::model::CallTree;

/// Turn a call tree into a percentage-ranked dependency graph.
///
/// Pure and infallible: an empty tree, or one where the selected metric is
/// zero everywhere, yields an empty graph (the "no data" state).
pub fn build_call_graph(tree: &CallTree, config: &GraphConfig) -> CallGraph {
    if tree.is_empty() {
        return CallGraph::default();
    }

    let visits = grouper::visit_tree(tree, config.visibility());
    let groups = grouper::group_calls(tree, &visits);
    let selection = threshold::select_groups(
        &groups,
        config.metric,
        config.effective_min_percentage(),
        &config.fallback,
    );
    if selection.grand_total <= 0.0 {
        tracing::debug!(metric = %config.metric, "selected metric is zero everywhere");
        return CallGraph::default();
    }

    let mut nodes = builder::build_nodes(&groups, &selection, config.metric);
    let edges = builder::build_edges(tree, &visits, &groups, &nodes);
    levels::assign_levels(&mut nodes, &edges);
    nodes.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| b.percentage.total_cmp(&a.percentage))
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!(nodes = nodes.len(), edges = edges.len(), "built call graph");
    CallGraph { nodes, edges }
}
