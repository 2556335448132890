use super::config::Visibility;
use super::metrics;
use crate::model::{CallNode, CallTree, ClassGroup, GroupSet, ROOT_KEY};

/// Pre-pass record for one node of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeVisit {
    pub node: usize,
    pub parent: Option<usize>,
    pub depth: u32,
    /// Whether the node's function type is currently shown.
    pub should_include: bool,
}

/// Walk the tree once in pre-order, recording parentage, depth and the
/// visibility decision for every node. The synthetic root is always kept.
pub fn visit_tree(tree: &CallTree, visibility: Visibility) -> Vec<NodeVisit> {
    tree.preorder()
        .into_iter()
        .filter_map(|idx| {
            let node = tree.node(idx)?;
            Some(NodeVisit {
                node: idx,
                parent: node.parent,
                depth: node.depth,
                should_include: node.synthetic || visibility.allows(node.function_type),
            })
        })
        .collect()
}

/// Identity a call is grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    pub key: String,
    pub class_name: Option<String>,
    pub file_name: Option<String>,
}

/// Class if present, else the file's last path segment, else the function.
pub fn group_key(node: &CallNode) -> GroupKey {
    if node.synthetic {
        return GroupKey {
            key: ROOT_KEY.to_string(),
            class_name: None,
            file_name: None,
        };
    }
    if let Some(class) = &node.class {
        return GroupKey {
            key: class.clone(),
            class_name: Some(class.clone()),
            file_name: None,
        };
    }
    if let Some(file) = node.file.as_deref().and_then(file_name) {
        return GroupKey {
            key: file.clone(),
            class_name: None,
            file_name: Some(file),
        };
    }
    GroupKey {
        key: node.function.clone(),
        class_name: None,
        file_name: None,
    }
}

/// Last segment of a path written with either separator.
pub fn file_name(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fold every included node into its group, accumulating self values for
/// all metric dimensions.
pub fn group_calls(tree: &CallTree, visits: &[NodeVisit]) -> GroupSet {
    let mut groups = GroupSet::new();
    for visit in visits.iter().filter(|v| v.should_include) {
        let Some(node) = tree.node(visit.node) else {
            continue;
        };
        let GroupKey {
            key,
            class_name,
            file_name,
        } = group_key(node);
        let slot = groups.index_or_insert_with(&key, || {
            ClassGroup::new(key.clone(), class_name, file_name, node.function_type, visit.depth)
        });
        let self_values = metrics::self_metrics(tree, visit.node);
        let Some(group) = groups.at_mut(slot) else {
            continue;
        };
        group.record_call(&node.function, visit.node, visit.depth, self_values);
        group.is_top_level |= tree.is_top_level(visit.node);
        group.is_entry |= tree.entry() == Some(visit.node);
    }
    tracing::debug!(groups = groups.len(), "grouped calls");
    groups
}
