use std::io::{self, Write};

use tracegraph_core::Metric;
use tracegraph_protocol::CallGraph;

/// Format a metric value for display. Time metrics are in seconds, memory
/// and network in bytes.
pub fn format_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::WallTime | Metric::IoWait | Metric::Cpu => {
            if value >= 1.0 {
                format!("{value:.2}s")
            } else if value >= 0.001 {
                format!("{:.1}ms", value * 1_000.0)
            } else {
                format!("{:.0}µs", value * 1_000_000.0)
            }
        }
        Metric::Memory | Metric::Network => {
            if value >= 1_073_741_824.0 {
                format!("{:.1} GiB", value / 1_073_741_824.0)
            } else if value >= 1_048_576.0 {
                format!("{:.1} MiB", value / 1_048_576.0)
            } else if value >= 1_024.0 {
                format!("{:.1} KiB", value / 1_024.0)
            } else {
                format!("{} B", value as u64)
            }
        }
    }
}

/// Write a plain-text listing: one line per node, indented by level, then
/// the edges.
pub fn write_summary(graph: &CallGraph, metric: Metric, out: &mut impl Write) -> io::Result<()> {
    if graph.is_empty() {
        writeln!(out, "no data for metric {metric}")?;
        return Ok(());
    }

    writeln!(out, "nodes ({metric}):")?;
    for node in &graph.nodes {
        let indent = "  ".repeat(node.level as usize + 1);
        writeln!(
            out,
            "{indent}{:>6.2}%  {}  {} [{} calls]",
            node.percentage,
            node.label,
            format_value(metric, node.value),
            node.call_count,
        )?;
    }

    writeln!(out, "edges:")?;
    for edge in &graph.edges {
        match &edge.label {
            Some(label) => writeln!(out, "  {} -> {} ({label})", edge.from, edge.to)?,
            None => writeln!(out, "  {} -> {}", edge.from, edge.to)?,
        }
    }
    Ok(())
}
