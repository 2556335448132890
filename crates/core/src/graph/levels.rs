use std::collections::{HashMap, VecDeque};

use tracegraph_protocol::{GraphEdge, GraphNode};

/// Assign a layer to every node for layered layouts.
///
/// Roots and nodes without incoming edges sit on level 0; everything else
/// gets its shortest edge distance from them. Nodes BFS cannot reach (a
/// cycle with no entry from a root) go one below their deepest assigned
/// parent.
pub fn assign_levels(nodes: &mut [GraphNode], edges: &[GraphEdge]) {
    let levels = compute_levels(nodes, edges);
    for (node, level) in nodes.iter_mut().zip(levels) {
        node.level = level;
    }
}

fn compute_levels(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<u32> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            outgoing[from].push(to);
            incoming[to].push(from);
        }
    }

    let mut level: Vec<Option<u32>> = vec![None; nodes.len()];
    let mut queue = VecDeque::new();
    for (i, node) in nodes.iter().enumerate() {
        if node.is_root || incoming[i].is_empty() {
            level[i] = Some(0);
            queue.push_back(i);
        }
    }

    // Relaxation only ever lowers a level, so the result is the shortest
    // distance regardless of visiting order.
    while let Some(u) = queue.pop_front() {
        let next = level[u].unwrap_or(0) + 1;
        for &v in &outgoing[u] {
            if level[v].is_none_or(|current| next < current) {
                level[v] = Some(next);
                queue.push_back(v);
            }
        }
    }

    let mut unreached: Vec<usize> = (0..nodes.len()).filter(|&i| level[i].is_none()).collect();
    unreached.sort_by(|&a, &b| nodes[a].id.cmp(&nodes[b].id));
    for i in unreached {
        let assigned = if incoming[i].is_empty() {
            0
        } else {
            incoming[i]
                .iter()
                .map(|&p| level[p].unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 1
        };
        level[i] = Some(assigned);
    }

    level.into_iter().map(|l| l.unwrap_or(0)).collect()
}
