use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{CallNode, CallTree, FunctionType, ROOT_KEY};

/// Durations above this are assumed to be milliseconds when the unit is
/// inferred.
pub const MS_INFERENCE_THRESHOLD: f64 = 1000.0;

/// Name given to calls that carry no function name.
pub const UNKNOWN_FUNCTION: &str = "unknown";

// Accepted spellings per field, in priority order: snake_case first, then
// PascalCase, then generic aliases.
const ID_KEYS: &[&str] = &["id", "call_id", "CallID"];
const FUNCTION_KEYS: &[&str] = &["function", "Function", "name"];
const CLASS_KEYS: &[&str] = &["class", "Class"];
const FILE_KEYS: &[&str] = &["file", "File"];
const LINE_KEYS: &[&str] = &["line", "Line"];
const DURATION_KEYS: &[&str] = &["duration_ms", "DurationMs", "duration"];
const CPU_KEYS: &[&str] = &["cpu_ms", "CPUMs", "cpu_time", "cpu"];
const IO_WAIT_KEYS: &[&str] = &["io_wait_ms", "IOWaitMs", "io_wait_time", "io_wait"];
const WALL_TIME_KEYS: &[&str] = &["wall_time_ms", "WallTimeMs", "wall_time"];
const MEMORY_KEYS: &[&str] = &["memory_delta", "MemoryDelta"];
const SENT_KEYS: &[&str] = &["network_bytes_sent", "NetworkBytesSent", "bytes_sent_delta"];
const RECEIVED_KEYS: &[&str] = &[
    "network_bytes_received",
    "NetworkBytesReceived",
    "bytes_received_delta",
];
const FUNCTION_TYPE_KEYS: &[&str] = &["function_type", "FunctionType"];
const CHILDREN_KEYS: &[&str] = &["children", "Children"];
const ENVELOPE_KEYS: &[&str] = &["calls", "Calls", "roots"];

/// How raw duration figures should be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    /// Values above [`MS_INFERENCE_THRESHOLD`] are milliseconds, everything
    /// else is seconds. A best-effort guess for producers that don't say.
    #[default]
    Infer,
    Milliseconds,
    Seconds,
}

impl DurationUnit {
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            Self::Infer if value > MS_INFERENCE_THRESHOLD => value / 1000.0,
            Self::Infer | Self::Seconds => value,
            Self::Milliseconds => value / 1000.0,
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Infer => "infer",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        })
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infer" | "auto" => Ok(Self::Infer),
            "ms" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "seconds" => Ok(Self::Seconds),
            other => Err(format!("unknown duration unit: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub duration_unit: DurationUnit,
}

/// Canonicalize a raw trace into a sealed [`CallTree`].
///
/// Accepts an array of root calls, a single root call, or an object holding
/// the roots under `calls`/`roots`. Anything else yields an empty tree.
/// Missing fields take defaults; nothing here fails.
pub fn normalize_value(value: &Value, options: &NormalizeOptions) -> CallTree {
    let roots: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => match first(obj, ENVELOPE_KEYS).and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![value],
        },
        _ => Vec::new(),
    };

    let mut builder = TreeBuilder {
        tree: CallTree::new(),
        // The synthetic root's id is reserved even when no root gets added.
        seen_ids: HashSet::from([ROOT_KEY.to_string()]),
        options: *options,
    };

    // Explicit stack so deeply nested traces cannot overflow. Children are
    // pushed in reverse so they are visited (and numbered) in call order.
    let mut stack: Vec<(&Value, Option<usize>)> = roots.into_iter().rev().map(|r| (r, None)).collect();
    while let Some((raw, parent)) = stack.pop() {
        let Some(obj) = raw.as_object() else {
            continue;
        };
        let idx = builder.add(obj, parent);
        if let Some(children) = first(obj, CHILDREN_KEYS).and_then(Value::as_array) {
            stack.extend(children.iter().rev().map(|c| (c, Some(idx))));
        }
    }

    let mut tree = builder.tree;
    tree.seal();
    tracing::debug!(
        nodes = tree.len(),
        top_level = tree.top_level().len(),
        synthetic_root = tree.has_synthetic_root(),
        "normalized call tree"
    );
    tree
}

struct TreeBuilder {
    tree: CallTree,
    seen_ids: HashSet<String>,
    options: NormalizeOptions,
}

impl TreeBuilder {
    fn add(&mut self, obj: &Map<String, Value>, parent: Option<usize>) -> usize {
        let position = self.tree.len();
        let id = self.unique_id(id_field(obj), position);
        let function = string_field(obj, FUNCTION_KEYS).unwrap_or_else(|| UNKNOWN_FUNCTION.to_string());
        let unit = self.options.duration_unit;

        let mut node = CallNode::new(id, function);
        node.class = string_field(obj, CLASS_KEYS);
        node.file = string_field(obj, FILE_KEYS);
        node.line = number_field(obj, LINE_KEYS)
            .filter(|l| *l >= 0.0 && *l <= f64::from(u32::MAX))
            .map(|l| l as u32);
        node.duration = duration_field(obj, DURATION_KEYS, unit);
        node.cpu_time = duration_field(obj, CPU_KEYS, unit);
        node.io_wait_time = duration_field(obj, IO_WAIT_KEYS, unit);
        node.wall_time = duration_field(obj, WALL_TIME_KEYS, unit);
        node.memory_delta = number_field(obj, MEMORY_KEYS).map_or(0, |m| m as i64);
        node.bytes_sent_delta = byte_field(obj, SENT_KEYS);
        node.bytes_received_delta = byte_field(obj, RECEIVED_KEYS);
        node.function_type = number_field(obj, FUNCTION_TYPE_KEYS)
            .map_or(FunctionType::Unknown, |code| FunctionType::from_code(code as i64));

        self.tree.push(node, parent)
    }

    /// Keep the provided id when it is new, otherwise synthesize
    /// `node_<position>` so identical input always yields identical ids.
    fn unique_id(&mut self, provided: Option<String>, position: usize) -> String {
        if let Some(id) = provided {
            if !self.seen_ids.contains(&id) {
                self.seen_ids.insert(id.clone());
                return id;
            }
            tracing::warn!(id = %id, position, "duplicate or reserved call id, synthesizing a new one");
        }
        let mut candidate = format!("node_{position}");
        let mut bump = 0usize;
        while self.seen_ids.contains(&candidate) {
            bump += 1;
            candidate = format!("node_{position}_{bump}");
        }
        self.seen_ids.insert(candidate.clone());
        candidate
    }
}

/// First present, non-null value among `keys`.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_field(obj: &Map<String, Value>) -> Option<String> {
    ID_KEYS.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite())
}

fn duration_field(obj: &Map<String, Value>, keys: &[&str], unit: DurationUnit) -> f64 {
    number_field(obj, keys).map_or(0.0, |d| unit.to_seconds(d))
}

fn byte_field(obj: &Map<String, Value>, keys: &[&str]) -> u64 {
    number_field(obj, keys).map_or(0, |b| b.max(0.0) as u64)
}
