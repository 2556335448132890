use std::collections::HashMap;

use tracegraph_protocol::GroupMetrics;

use super::call_tree::{FunctionType, ROOT_KEY};

/// Weight of accumulated self duration in the dominant-method score.
const DOMINANT_DURATION_WEIGHT: f64 = 0.7;
/// Weight of call frequency in the dominant-method score.
const DOMINANT_CALLS_WEIGHT: f64 = 0.3;

/// Per-method statistics within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodStats {
    pub name: String,
    /// Arena index of the first call seen for this method.
    pub representative: usize,
    pub call_count: u64,
    pub self_duration: f64,
}

/// All calls sharing one class, file or function identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroup {
    pub key: String,
    pub class_name: Option<String>,
    pub file_name: Option<String>,
    /// Methods in first-seen order.
    pub methods: Vec<MethodStats>,
    method_index: HashMap<String, usize>,
    /// Sums of self values only.
    pub totals: GroupMetrics,
    /// Taken from the first contributing call.
    pub function_type: FunctionType,
    /// Shallowest depth of any contributing call.
    pub depth: u32,
    /// Holds at least one call that had no parent in the input.
    pub is_top_level: bool,
    /// Holds the tree's entry node (synthetic root or sole top-level call).
    pub is_entry: bool,
}

impl ClassGroup {
    pub fn new(
        key: impl Into<String>,
        class_name: Option<String>,
        file_name: Option<String>,
        function_type: FunctionType,
        depth: u32,
    ) -> Self {
        Self {
            key: key.into(),
            class_name,
            file_name,
            methods: Vec::new(),
            method_index: HashMap::new(),
            totals: GroupMetrics::default(),
            function_type,
            depth,
            is_top_level: false,
            is_entry: false,
        }
    }

    /// Roots always survive filtering.
    pub fn is_root(&self) -> bool {
        self.key == ROOT_KEY || self.is_top_level || self.is_entry
    }

    pub fn is_synthetic_root(&self) -> bool {
        self.key == ROOT_KEY
    }

    /// Whether the group is anchored to a class or file rather than a bare
    /// function name.
    pub fn has_location(&self) -> bool {
        self.class_name.is_some() || self.file_name.is_some()
    }

    /// Fold one call of `function` into the group.
    pub fn record_call(&mut self, function: &str, node: usize, depth: u32, self_values: GroupMetrics) {
        let slot = match self.method_index.get(function) {
            Some(&slot) => slot,
            None => {
                self.methods.push(MethodStats {
                    name: function.to_string(),
                    representative: node,
                    call_count: 0,
                    self_duration: 0.0,
                });
                let slot = self.methods.len() - 1;
                self.method_index.insert(function.to_string(), slot);
                slot
            }
        };
        let method = &mut self.methods[slot];
        method.call_count += 1;
        method.self_duration += self_values.duration;
        self.totals += self_values;
        self.depth = self.depth.min(depth);
    }

    pub fn method(&self, name: &str) -> Option<&MethodStats> {
        self.method_index.get(name).map(|&slot| &self.methods[slot])
    }

    pub fn call_count(&self) -> u64 {
        self.methods.iter().map(|m| m.call_count).sum()
    }

    /// The method with the highest blend of self duration and call
    /// frequency. Ties go to the method seen first.
    pub fn dominant_method(&self) -> Option<&MethodStats> {
        if self.methods.is_empty() {
            return None;
        }
        let per_method = self.totals.duration / self.methods.len() as f64;
        let score = |m: &MethodStats| {
            DOMINANT_DURATION_WEIGHT * m.self_duration
                + DOMINANT_CALLS_WEIGHT * m.call_count as f64 * per_method
        };

        let mut best: Option<(&MethodStats, f64)> = None;
        for method in &self.methods {
            let s = score(method);
            match best {
                Some((_, top)) if s <= top => {}
                _ => best = Some((method, s)),
            }
        }
        best.map(|(m, _)| m)
    }

    /// Human-readable label: the key, qualified by the dominant method when
    /// that adds information.
    pub fn label(&self) -> String {
        if self.is_synthetic_root() {
            return "(root)".to_string();
        }
        match self.dominant_method() {
            Some(m) if m.name != self.key => format!("{}::{}", self.key, m.name),
            _ => self.key.clone(),
        }
    }
}

/// Groups in first-seen order with lookup by key.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    groups: Vec<ClassGroup>,
    by_key: HashMap<String, usize>,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the group for `key`, creating it with `make` on first use.
    pub fn index_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> ClassGroup) -> usize {
        if let Some(&idx) = self.by_key.get(key) {
            return idx;
        }
        let idx = self.groups.len();
        self.groups.push(make());
        self.by_key.insert(key.to_string(), idx);
        idx
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&ClassGroup> {
        self.index_of(key).map(|idx| &self.groups[idx])
    }

    pub fn at(&self, idx: usize) -> Option<&ClassGroup> {
        self.groups.get(idx)
    }

    pub fn at_mut(&mut self, idx: usize) -> Option<&mut ClassGroup> {
        self.groups.get_mut(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
