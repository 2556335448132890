use super::config::FallbackPolicy;
use super::metrics::Metric;
use crate::model::GroupSet;

/// Which groups survive into the visible graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Surviving group indices, in group order.
    pub included: Vec<usize>,
    /// Selected-metric total across every group.
    pub grand_total: f64,
    /// Selected-metric total across surviving groups only.
    pub shown_total: f64,
    /// True when the degenerate-result guard forced groups in.
    pub fallback_applied: bool,
}

impl Selection {
    pub fn contains(&self, group: usize) -> bool {
        self.included.contains(&group)
    }

    /// Display share of `value` among the surviving groups.
    pub fn percentage(&self, value: f64) -> f64 {
        if self.shown_total > 0.0 {
            value / self.shown_total * 100.0
        } else {
            0.0
        }
    }
}

/// Keep root groups and every group whose share of the grand total reaches
/// `min_percentage`. If that leaves only roots, or too few groups to be
/// informative, force in the heaviest non-root groups regardless.
pub fn select_groups(
    groups: &GroupSet,
    metric: Metric,
    min_percentage: f64,
    fallback: &FallbackPolicy,
) -> Selection {
    let values: Vec<f64> = groups.iter().map(|g| metric.total(&g.totals)).collect();
    let grand_total: f64 = values.iter().sum();

    let mut keep: Vec<bool> = groups
        .iter()
        .zip(&values)
        .map(|(group, &value)| {
            let share = if grand_total > 0.0 {
                value / grand_total * 100.0
            } else {
                0.0
            };
            group.is_root() || share >= min_percentage
        })
        .collect();

    let kept = keep.iter().filter(|k| **k).count();
    let only_roots = groups
        .iter()
        .zip(&keep)
        .all(|(group, &k)| !k || group.is_root());

    let mut fallback_applied = false;
    if only_roots || kept <= fallback.degenerate_group_count {
        let mut candidates: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.is_root())
            .map(|(idx, _)| idx)
            .collect();
        // Stable: equal values keep first-seen order.
        candidates.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
        for idx in candidates.into_iter().take(fallback.max_forced_groups) {
            fallback_applied |= !keep[idx];
            keep[idx] = true;
        }
    }

    let included: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter(|(_, k)| **k)
        .map(|(idx, _)| idx)
        .collect();
    let shown_total = included.iter().map(|&idx| values[idx]).sum();

    tracing::debug!(
        metric = %metric,
        total = groups.len(),
        included = included.len(),
        fallback_applied,
        "selected groups"
    );

    Selection {
        included,
        grand_total,
        shown_total,
        fallback_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::config::Visibility;
    use crate::graph::grouper::{group_calls, visit_tree};
    use crate::parsers::normalize_value;
    use serde_json::json;

    fn groups(value: serde_json::Value) -> GroupSet {
        let tree = normalize_value(&value, &Default::default());
        let visibility = Visibility {
            user: true,
            internal: true,
            methods: true,
        };
        group_calls(&tree, &visit_tree(&tree, visibility))
    }

    fn keys(groups: &GroupSet, selection: &Selection) -> Vec<String> {
        selection
            .included
            .iter()
            .filter_map(|&i| groups.at(i))
            .map(|g| g.key.clone())
            .collect()
    }

    /// main (self 1) calling five classes with self 40, 30, 20, 8, 1.
    fn five_classes() -> GroupSet {
        groups(json!({
            "function": "main", "duration": 100,
            "children": [
                {"function": "a", "class": "A", "duration": 40},
                {"function": "b", "class": "B", "duration": 30},
                {"function": "c", "class": "C", "duration": 20},
                {"function": "d", "class": "D", "duration": 8},
                {"function": "e", "class": "E", "duration": 1}
            ]
        }))
    }

    #[test]
    fn threshold_keeps_roots_and_large_groups() {
        let g = five_classes();
        let selection = select_groups(&g, Metric::WallTime, 5.0, &FallbackPolicy::default());
        assert_eq!(keys(&g, &selection), ["main", "A", "B", "C", "D"]);
        assert!(!selection.fallback_applied);
        assert_eq!(selection.grand_total, 100.0);
        assert_eq!(selection.shown_total, 99.0);
    }

    #[test]
    fn displayed_percentages_close_over_survivors() {
        let g = five_classes();
        let selection = select_groups(&g, Metric::WallTime, 5.0, &FallbackPolicy::default());
        let sum: f64 = selection
            .included
            .iter()
            .map(|&i| selection.percentage(Metric::WallTime.total(&g.at(i).unwrap().totals)))
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_forces_heaviest_groups_when_only_root_survives() {
        let g = five_classes();
        let selection = select_groups(&g, Metric::WallTime, 90.0, &FallbackPolicy::default());
        assert!(selection.fallback_applied);
        assert_eq!(keys(&g, &selection), ["main", "A", "B", "C", "D", "E"]);
    }

    #[test]
    fn fallback_respects_forced_group_limit() {
        let g = five_classes();
        let policy = FallbackPolicy {
            max_forced_groups: 2,
            degenerate_group_count: 2,
        };
        let selection = select_groups(&g, Metric::WallTime, 90.0, &policy);
        assert_eq!(keys(&g, &selection), ["main", "A", "B"]);
    }

    #[test]
    fn fallback_triggers_on_two_groups() {
        // Root plus one survivor is still degenerate.
        let g = five_classes();
        let selection = select_groups(&g, Metric::WallTime, 35.0, &FallbackPolicy::default());
        assert!(selection.fallback_applied);
        assert_eq!(selection.included.len(), 6);
    }

    #[test]
    fn zero_total_keeps_roots_only() {
        let g = five_classes();
        let selection = select_groups(&g, Metric::Network, 0.5, &FallbackPolicy::default());
        assert_eq!(selection.grand_total, 0.0);
        assert_eq!(selection.percentage(0.0), 0.0);
        // The guard still fires; all candidates carry zero.
        assert!(selection.contains(0));
    }
}
