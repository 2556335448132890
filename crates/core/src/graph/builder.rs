use std::collections::HashMap;

use tracegraph_protocol::{ColorClass, GraphEdge, GraphNode};

use super::grouper::{NodeVisit, group_key};
use super::metrics::Metric;
use super::threshold::Selection;
use crate::model::{CallTree, ClassGroup, FunctionType, GroupSet};

/// Fixed display size of root nodes.
pub const ROOT_NODE_SIZE: f64 = 60.0;
const BASE_NODE_SIZE: f64 = 40.0;
const MIN_NODE_SIZE: f64 = 35.0;
const MAX_NODE_SIZE: f64 = 100.0;
const MIN_EDGE_WIDTH: f64 = 1.0;
const MAX_EDGE_WIDTH: f64 = 3.0;

/// Turn surviving groups into graph nodes. Levels are assigned later.
///
/// Non-root groups with a zero value are dropped, except for metrics whose
/// value falls back to duration.
pub fn build_nodes(groups: &GroupSet, selection: &Selection, metric: Metric) -> Vec<GraphNode> {
    selection
        .included
        .iter()
        .filter_map(|&idx| groups.at(idx))
        .filter_map(|group| {
            let value = metric.total(&group.totals);
            if !group.is_root() && value == 0.0 && !metric.tolerates_zero() {
                return None;
            }
            let percentage = selection.percentage(value);
            Some(GraphNode {
                id: group.key.clone(),
                label: group.label(),
                class_name: group.class_name.clone(),
                file_name: group.file_name.clone(),
                dominant_method: group.dominant_method().map(|m| m.name.clone()),
                method_count: group.methods.len(),
                call_count: group.call_count(),
                metrics: group.totals,
                value,
                percentage,
                level: 0,
                color: color_class(group),
                size: node_size(group, percentage),
                is_root: group.is_entry,
            })
        })
        .collect()
}

/// Every root (the synthetic marker, a top-level call or the entry) is drawn
/// neutral at a fixed size. Other groups are colored by function type.
fn color_class(group: &ClassGroup) -> ColorClass {
    if group.is_root() {
        return ColorClass::Root;
    }
    match group.function_type {
        FunctionType::User | FunctionType::Unknown => ColorClass::UserFunction,
        FunctionType::Internal => ColorClass::InternalFunction,
        FunctionType::Method => ColorClass::Method,
    }
}

fn node_size(group: &ClassGroup, percentage: f64) -> f64 {
    if group.is_root() {
        ROOT_NODE_SIZE
    } else {
        (BASE_NODE_SIZE + percentage).clamp(MIN_NODE_SIZE, MAX_NODE_SIZE)
    }
}

/// Whether a call from group `parent` into group `child` is drawn.
///
/// Only the synthetic root may point at anything. Otherwise both ends must
/// be anchored to a class or file, so a bare-function group never links to
/// another one, not even from a top-level call.
fn edge_allowed(parent: &ClassGroup, child: &ClassGroup) -> bool {
    parent.key != child.key
        && (parent.is_synthetic_root() || (parent.has_location() && child.has_location()))
}

/// Walk the full tree once and connect each visible group to the nearest
/// visible ancestor group. Hidden or filtered calls pass their parent's
/// group through to their children, so edges skip over them.
pub fn build_edges(
    tree: &CallTree,
    visits: &[NodeVisit],
    groups: &GroupSet,
    nodes: &[GraphNode],
) -> Vec<GraphEdge> {
    let percentages: HashMap<&str, f64> = nodes.iter().map(|n| (n.id.as_str(), n.percentage)).collect();

    // Visible group of each arena node, if it has one.
    let mut visible_group: Vec<Option<usize>> = vec![None; tree.len()];
    for visit in visits.iter().filter(|v| v.should_include) {
        let Some(node) = tree.node(visit.node) else {
            continue;
        };
        let key = group_key(node).key;
        if percentages.contains_key(key.as_str()) {
            visible_group[visit.node] = groups.index_of(&key);
        }
    }

    let mut counts: HashMap<(usize, usize), u32> = HashMap::new();
    let mut visited = vec![false; tree.len()];
    let mut stack: Vec<(usize, Option<usize>)> = tree.entry().map(|e| (e, None)).into_iter().collect();

    while let Some((idx, carried)) = stack.pop() {
        let Some(node) = tree.node(idx) else {
            continue;
        };
        if std::mem::replace(&mut visited[idx], true) {
            continue;
        }
        let own = visible_group[idx];
        if let (Some(p), Some(c)) = (carried, own)
            && let (Some(parent), Some(child)) = (groups.at(p), groups.at(c))
            && edge_allowed(parent, child)
        {
            *counts.entry((p, c)).or_insert(0) += 1;
        }
        let next = own.or(carried);
        stack.extend(node.children.iter().rev().map(|&child| (child, next)));
    }

    let mut edges: Vec<GraphEdge> = counts
        .into_iter()
        .filter_map(|((p, c), weight)| {
            let from = groups.at(p)?.key.clone();
            let to = groups.at(c)?.key.clone();
            let percentage = percentages.get(to.as_str()).copied().unwrap_or(0.0);
            Some(GraphEdge {
                from,
                to,
                weight,
                label: (weight > 1).then(|| format!("{weight}x")),
                width: (1.0 + percentage / 10.0).clamp(MIN_EDGE_WIDTH, MAX_EDGE_WIDTH),
            })
        })
        .collect();
    edges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));

    tracing::debug!(edges = edges.len(), "built edges");
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::config::{FallbackPolicy, Visibility};
    use crate::graph::grouper::{group_calls, visit_tree};
    use crate::graph::threshold::select_groups;
    use crate::parsers::normalize_value;
    use serde_json::json;

    const ALL: Visibility = Visibility {
        user: true,
        internal: true,
        methods: true,
    };

    fn build(value: serde_json::Value, metric: Metric, min: f64) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let tree = normalize_value(&value, &Default::default());
        let visits = visit_tree(&tree, ALL);
        let groups = group_calls(&tree, &visits);
        let selection = select_groups(&groups, metric, min, &FallbackPolicy::default());
        let nodes = build_nodes(&groups, &selection, metric);
        let edges = build_edges(&tree, &visits, &groups, &nodes);
        (nodes, edges)
    }

    fn pairs(edges: &[GraphEdge]) -> Vec<(&str, &str)> {
        edges.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect()
    }

    #[test]
    fn repeated_calls_merge_into_weighted_edge() {
        let (_, edges) = build(
            json!({
                "function": "handle", "class": "Api", "duration": 10,
                "children": [
                    {"function": "get", "class": "Cache", "duration": 2},
                    {"function": "get", "class": "Cache", "duration": 2},
                    {"function": "put", "class": "Cache", "duration": 2}
                ]
            }),
            Metric::WallTime,
            0.5,
        );
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 3);
        assert_eq!(edges[0].label.as_deref(), Some("3x"));
        assert!(edges[0].width >= 1.0 && edges[0].width <= 3.0);
    }

    #[test]
    fn edges_skip_filtered_intermediate_groups() {
        // Svc -> Tiny (filtered, 0.1%) -> Db, and Svc -> Log
        let (nodes, edges) = build(
            json!({
                "function": "run", "class": "Svc", "duration": 1000,
                "children": [
                    {"function": "hop", "class": "Tiny", "duration": 500,
                     "children": [{"function": "query", "class": "Db", "duration": 499}]},
                    {"function": "write", "class": "Log", "duration": 300}
                ]
            }),
            Metric::WallTime,
            5.0,
        );
        assert!(nodes.iter().all(|n| n.id != "Tiny"));
        assert_eq!(pairs(&edges), [("Svc", "Db"), ("Svc", "Log")]);
    }

    #[test]
    fn bare_functions_are_not_linked() {
        // Only app.py -> Foo is anchored on both ends. The bare main, helper
        // and util get no edges, even though main is the entry.
        let (_, edges) = build(
            json!({
                "function": "main", "duration": 100,
                "children": [
                    {"function": "helper", "duration": 40,
                     "children": [{"function": "util", "duration": 20}]},
                    {"function": "boot", "file": "src/app.py", "duration": 30,
                     "children": [{"function": "work", "class": "Foo", "duration": 10}]}
                ]
            }),
            Metric::WallTime,
            0.5,
        );
        assert_eq!(pairs(&edges), [("app.py", "Foo")]);
    }

    #[test]
    fn top_level_bare_function_does_not_link_bare_callee() {
        let (nodes, edges) = build(
            json!([
                {"function": "A", "duration": 60,
                 "children": [{"function": "helper", "duration": 30}]},
                {"function": "B", "duration": 40}
            ]),
            Metric::WallTime,
            0.5,
        );
        assert!(nodes.iter().any(|n| n.id == "helper"));
        assert_eq!(pairs(&edges), [("__root__", "A"), ("__root__", "B")]);
    }

    #[test]
    fn same_group_calls_make_no_self_loop() {
        let (nodes, edges) = build(
            json!({
                "function": "a", "class": "Foo", "duration": 100,
                "children": [{"function": "b", "class": "Foo", "duration": 90,
                    "children": [{"function": "c", "class": "Foo", "duration": 10}]}]
            }),
            Metric::WallTime,
            50.0,
        );
        assert_eq!(nodes.len(), 1);
        assert!(edges.is_empty());
    }

    #[test]
    fn zero_value_groups_dropped_for_memory() {
        let (nodes, _) = build(
            json!({
                "function": "main", "memory_delta": 100,
                "children": [
                    {"function": "alloc", "class": "Pool", "memory_delta": 100},
                    {"function": "noop", "class": "Idle"}
                ]
            }),
            Metric::Memory,
            0.0,
        );
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["main", "Pool"]);
    }

    #[test]
    fn sizes_and_colors() {
        let (nodes, _) = build(
            json!({
                "function": "main", "function_type": 0, "duration": 10,
                "children": [
                    {"function": "len", "file": "lib/builtins.py", "function_type": 1, "duration": 6},
                    {"function": "save", "class": "Model", "function_type": 2, "duration": 3}
                ]
            }),
            Metric::WallTime,
            0.5,
        );
        let main = nodes.iter().find(|n| n.id == "main").unwrap();
        assert_eq!(main.color, ColorClass::Root);
        assert_eq!(main.size, ROOT_NODE_SIZE);
        let builtins = nodes.iter().find(|n| n.id == "builtins.py").unwrap();
        assert_eq!(builtins.color, ColorClass::InternalFunction);
        assert!((builtins.size - 100.0).abs() < 1e-9);
        let model = nodes.iter().find(|n| n.id == "Model").unwrap();
        assert_eq!(model.color, ColorClass::Method);
        assert!((model.size - 70.0).abs() < 1e-9);
    }

    #[test]
    fn top_level_calls_are_styled_as_roots() {
        let (nodes, _) = build(
            json!([
                {"function": "A", "function_type": 2, "duration": 80},
                {"function": "B", "function_type": 1, "duration": 20}
            ]),
            Metric::WallTime,
            0.5,
        );
        for id in ["__root__", "A", "B"] {
            let node = nodes.iter().find(|n| n.id == id).unwrap();
            assert_eq!(node.color, ColorClass::Root, "{id}");
            assert_eq!(node.size, ROOT_NODE_SIZE, "{id}");
        }
        assert!(!nodes.iter().find(|n| n.id == "A").unwrap().is_root);
    }
}
