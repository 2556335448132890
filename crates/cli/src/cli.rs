//! Command-line arguments for tracegraph

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracegraph_core::Metric;
use tracegraph_core::parsers::DurationUnit;

/// Output format for the computed graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Graph as JSON for rendering front ends (default)
    Json,
    /// Human-readable node and edge listing
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "tracegraph")]
#[command(version)]
#[command(about = "Turn a per-request call trace into a ranked dependency graph", long_about = None)]
pub struct Cli {
    /// Trace file (JSON array of root calls)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// JSON graph config; flags given on the command line override it
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Metric to rank groups by: wall_time, io_wait, cpu, memory, network
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<Metric>,

    /// Hide groups below this share of the total (percent)
    #[arg(short = 'p', long = "min-percentage", value_name = "PERCENT")]
    pub min_percentage: Option<f64>,

    /// Leave user functions out of the graph
    #[arg(long = "hide-user")]
    pub hide_user: bool,

    /// Leave internal/library functions out of the graph
    #[arg(long = "hide-internal")]
    pub hide_internal: bool,

    /// Leave object methods out of the graph
    #[arg(long = "hide-methods")]
    pub hide_methods: bool,

    /// Unit of raw durations: infer, ms or s
    #[arg(long = "duration-unit", value_name = "UNIT", default_value = "infer")]
    pub duration_unit: DurationUnit,

    /// Groups forced in when filtering leaves too little to show
    #[arg(long = "max-forced-groups", value_name = "N")]
    pub max_forced_groups: Option<usize>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
