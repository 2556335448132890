//! Property tests: exclusive values must add back up to inclusive ones, and
//! the pipeline must stay deterministic and well-formed on arbitrary trees.

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::{Value, json};
use tracegraph_core::graph::metrics::{self, Metric};
use tracegraph_core::parsers::{DurationUnit, NormalizeOptions, normalize_value};
use tracegraph_core::{CallTree, GraphConfig, build_call_graph};

const CLASSES: &[&str] = &["Repo", "Cache", "View", "Db"];

/// Trees whose recorded durations are consistent: every node's duration is
/// its own work plus its children's durations.
fn consistent_call() -> impl Strategy<Value = Value> {
    let leaf = (0.0f64..10.0, -500i64..500, 0usize..5).prop_map(|(own, mem, class)| node(own, mem, class, vec![]));
    leaf.prop_recursive(4, 40, 4, |inner| {
        (0.0f64..10.0, -500i64..500, 0usize..5, prop::collection::vec(inner, 0..4))
            .prop_map(|(own, mem, class, children)| node(own, mem, class, children))
    })
}

/// Trees with independent, possibly contradictory figures per node.
fn noisy_call() -> impl Strategy<Value = Value> {
    let leaf = (0.0f64..50.0, 0u32..4096).prop_map(|(d, bytes)| {
        json!({"function": "leaf", "duration": d, "network_bytes_sent": bytes})
    });
    leaf.prop_recursive(4, 40, 4, |inner| {
        (0.0f64..50.0, 0u32..4096, prop::collection::vec(inner, 0..4)).prop_map(|(d, bytes, children)| {
            json!({"function": "inner", "duration": d, "network_bytes_sent": bytes, "children": children})
        })
    })
}

fn node(own: f64, memory: i64, class: usize, children: Vec<Value>) -> Value {
    let duration = own + children.iter().filter_map(|c| c["duration"].as_f64()).sum::<f64>();
    let mut value = json!({
        "function": format!("f{class}"),
        "duration": duration,
        "memory_delta": memory,
        "children": children,
    });
    if let Some(name) = CLASSES.get(class) {
        value["class"] = json!(name);
    }
    value
}

/// Durations here are already seconds; keep the unit heuristic out of it.
fn seconds() -> NormalizeOptions {
    NormalizeOptions {
        duration_unit: DurationUnit::Seconds,
    }
}

fn subtree(tree: &CallTree, idx: usize) -> Vec<usize> {
    let mut out = vec![idx];
    let mut i = 0;
    while i < out.len() {
        if let Some(node) = tree.node(out[i]) {
            out.extend(node.children.iter().copied());
        }
        i += 1;
    }
    out
}

proptest! {
    #[test]
    fn signed_memory_self_values_telescope(raw in prop::collection::vec(consistent_call(), 1..3)) {
        let tree = normalize_value(&Value::Array(raw), &seconds());
        for idx in 0..tree.len() {
            let total: i64 = subtree(&tree, idx).iter().map(|&i| metrics::signed_self_memory(&tree, i)).sum();
            prop_assert_eq!(total, tree.node(idx).unwrap().memory_delta);
        }
    }

    #[test]
    fn consistent_durations_are_conserved(raw in consistent_call()) {
        let tree = normalize_value(&raw, &seconds());
        for idx in 0..tree.len() {
            let total: f64 = subtree(&tree, idx).iter().map(|&i| metrics::self_value(&tree, i, Metric::WallTime)).sum();
            let inclusive = metrics::inclusive(tree.node(idx).unwrap(), Metric::WallTime);
            prop_assert!((total - inclusive).abs() < 1e-6, "{} vs {}", total, inclusive);
        }
    }

    #[test]
    fn floored_values_never_undercount(raw in noisy_call()) {
        let tree = normalize_value(&raw, &Default::default());
        for metric in [Metric::WallTime, Metric::Network] {
            for idx in 0..tree.len() {
                let total: f64 = subtree(&tree, idx).iter().map(|&i| metrics::self_value(&tree, i, metric)).sum();
                let inclusive = metrics::inclusive(tree.node(idx).unwrap(), metric);
                prop_assert!(total + 1e-6 >= inclusive);
                prop_assert!(metrics::self_value(&tree, idx, metric) >= 0.0);
            }
        }
    }

    #[test]
    fn graphs_are_deterministic_and_well_formed(
        raw in prop::collection::vec(consistent_call(), 1..4),
        min in 0.0f64..60.0,
    ) {
        let tree = normalize_value(&Value::Array(raw), &seconds());
        for metric in [Metric::WallTime, Metric::Memory] {
            let config = GraphConfig { metric, min_percentage: min, ..Default::default() };
            let graph = build_call_graph(&tree, &config);
            prop_assert_eq!(&graph, &build_call_graph(&tree, &config));
            if graph.is_empty() {
                continue;
            }

            let sum: f64 = graph.nodes.iter().map(|n| n.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 1e-6, "percentages sum to {}", sum);

            let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
            prop_assert_eq!(ids.len(), graph.nodes.len());
            for edge in &graph.edges {
                prop_assert!(ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()));
                prop_assert_ne!(&edge.from, &edge.to);
                prop_assert!(edge.weight >= 1);
            }
        }
    }
}
