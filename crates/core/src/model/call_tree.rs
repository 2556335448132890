use serde::{Deserialize, Serialize};

use crate::graph::metrics::{self, Metric};

/// Group key and id reserved for the synthetic root that unifies several
/// top-level calls.
pub const ROOT_KEY: &str = "__root__";

/// How an instrumented call was classified by the tracer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    User,
    Internal,
    Method,
    #[default]
    Unknown,
}

impl FunctionType {
    /// Decode the tracer's integer code. Anything unrecognized is `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::User,
            1 => Self::Internal,
            2 => Self::Method,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::User => 0,
            Self::Internal => 1,
            Self::Method => 2,
            Self::Unknown => -1,
        }
    }
}

/// One instrumented function invocation, canonicalized.
///
/// Durations are stored in seconds. Tree structure is expressed through
/// arena indices into the owning [`CallTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    /// Unique within the owning tree.
    pub id: String,
    pub function: String,
    pub class: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub duration: f64,
    pub cpu_time: f64,
    pub io_wait_time: f64,
    pub wall_time: f64,
    /// Signed: frees exceeding allocations are negative.
    pub memory_delta: i64,
    pub bytes_sent_delta: u64,
    pub bytes_received_delta: u64,
    pub function_type: FunctionType,
    pub parent: Option<usize>,
    /// Children in call order.
    pub children: Vec<usize>,
    /// 0 for the entry node.
    pub depth: u32,
    /// True only for the synthetic root.
    pub synthetic: bool,
}

impl CallNode {
    pub fn new(id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            class: None,
            file: None,
            line: None,
            duration: 0.0,
            cpu_time: 0.0,
            io_wait_time: 0.0,
            wall_time: 0.0,
            memory_delta: 0,
            bytes_sent_delta: 0,
            bytes_received_delta: 0,
            function_type: FunctionType::Unknown,
            parent: None,
            children: Vec::new(),
            depth: 0,
            synthetic: false,
        }
    }
}

/// A call tree stored as an index arena.
///
/// `top_level` lists the calls that had no parent in the input. When there
/// is more than one of them, [`CallTree::seal`] adds a synthetic root above
/// them so every traversal starts from a single entry node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallTree {
    nodes: Vec<CallNode>,
    top_level: Vec<usize>,
    entry: Option<usize>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a top-level call) and return its index.
    pub fn push(&mut self, mut node: CallNode, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        node.parent = parent;
        node.children.clear();
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => {
                node.depth = parent_node.depth + 1;
                parent_node.children.push(idx);
            }
            None => {
                node.parent = None;
                node.depth = 0;
                self.top_level.push(idx);
            }
        }
        self.nodes.push(node);
        idx
    }

    /// Fix the entry node, inserting a synthetic root when the input had
    /// several top-level calls. Idempotent.
    pub fn seal(&mut self) {
        if self.entry.is_some() {
            return;
        }
        match self.top_level.as_slice() {
            [] => {}
            [only] => self.entry = Some(*only),
            roots => {
                let root = self.synthetic_root(roots);
                let idx = self.nodes.len();
                for node in &mut self.nodes {
                    node.depth += 1;
                }
                for &top in &self.top_level {
                    self.nodes[top].parent = Some(idx);
                }
                self.nodes.push(root);
                self.entry = Some(idx);
            }
        }
    }

    /// The synthetic root carries the sum of its children's inclusive values,
    /// so its own exclusive contribution is zero for every metric.
    fn synthetic_root(&self, roots: &[usize]) -> CallNode {
        let mut root = CallNode::new(ROOT_KEY, ROOT_KEY);
        root.synthetic = true;
        root.function_type = FunctionType::User;
        root.children = roots.to_vec();
        for &idx in roots {
            let child = &self.nodes[idx];
            root.duration += child.duration;
            root.wall_time += metrics::inclusive(child, Metric::WallTime);
            root.cpu_time += metrics::inclusive(child, Metric::Cpu);
            root.io_wait_time += child.io_wait_time;
            root.memory_delta = root.memory_delta.saturating_add(child.memory_delta);
            root.bytes_sent_delta = root.bytes_sent_delta.saturating_add(child.bytes_sent_delta);
            root.bytes_received_delta = root
                .bytes_received_delta
                .saturating_add(child.bytes_received_delta);
        }
        root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&CallNode> {
        self.nodes.get(idx)
    }

    /// Index of the node whose id is `id`.
    pub fn find(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Calls that had no parent in the input.
    pub fn top_level(&self) -> &[usize] {
        &self.top_level
    }

    pub fn is_top_level(&self, idx: usize) -> bool {
        self.top_level.contains(&idx)
    }

    /// Single node every traversal starts from; `None` for an empty or
    /// unsealed tree.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    pub fn has_synthetic_root(&self) -> bool {
        self.entry
            .and_then(|idx| self.nodes.get(idx))
            .is_some_and(|n| n.synthetic)
    }

    /// Direct children of `idx`, in call order.
    pub fn children(&self, idx: usize) -> impl Iterator<Item = &CallNode> {
        self.nodes
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&c| self.nodes.get(c))
    }

    /// Pre-order traversal from the entry node. A node reached twice is not
    /// descended into again, so malformed parent links cannot loop.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.entry.into_iter().collect();
        while let Some(idx) = stack.pop() {
            let Some(seen) = visited.get_mut(idx) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }
}
