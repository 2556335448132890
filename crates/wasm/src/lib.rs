use tracegraph_core::graph::GraphConfig;
use tracegraph_core::{Metric, build_call_graph, parse_trace};
use tracegraph_protocol::CallGraph;
use wasm_bindgen::prelude::*;

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn graph_for(trace: &[u8], config: &GraphConfig) -> Result<CallGraph, JsError> {
    let tree = parse_trace(trace).map_err(js_error)?;
    Ok(build_call_graph(&tree, config))
}

/// Build the dependency graph for a trace, returning it as JSON.
///
/// `config_json` is a graph config object; an empty string means defaults.
#[wasm_bindgen]
pub fn build_graph(trace: &[u8], config_json: &str) -> Result<String, JsError> {
    let config = if config_json.trim().is_empty() {
        GraphConfig::default()
    } else {
        GraphConfig::from_json(config_json.as_bytes()).map_err(js_error)?
    };
    let graph = graph_for(trace, &config)?;
    serde_json::to_string(&graph).map_err(js_error)
}

/// Build the graph for one metric with an otherwise default config.
#[wasm_bindgen]
pub fn build_graph_for_metric(trace: &[u8], metric: &str, min_percentage: f64) -> Result<String, JsError> {
    let metric: Metric = metric.parse().map_err(js_error)?;
    let config = GraphConfig {
        min_percentage,
        ..GraphConfig::with_metric(metric)
    };
    let graph = graph_for(trace, &config)?;
    serde_json::to_string(&graph).map_err(js_error)
}

/// Names of the metrics the graph can be ranked by.
#[wasm_bindgen]
pub fn metric_names() -> Vec<String> {
    Metric::ALL.iter().map(|m| m.name().to_owned()).collect()
}
