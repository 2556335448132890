mod cli;
mod summary;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracegraph_core::parsers::{NormalizeOptions, parse_trace_with};
use tracegraph_core::{GraphConfig, build_call_graph};
use tracing_subscriber::EnvFilter;

use cli::{Cli, OutputFormat};

/// Log to stderr. `--debug` raises the default level; `RUST_LOG` wins.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Config file first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<GraphConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            GraphConfig::from_json(&data).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => GraphConfig::default(),
    };
    if let Some(metric) = cli.metric {
        config.metric = metric;
    }
    if let Some(min) = cli.min_percentage {
        config.min_percentage = min;
    }
    if let Some(max) = cli.max_forced_groups {
        config.fallback.max_forced_groups = max;
    }
    config.show_user_functions &= !cli.hide_user;
    config.show_internal_functions &= !cli.hide_internal;
    config.show_methods &= !cli.hide_methods;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    let data = std::fs::read(&cli.trace)
        .with_context(|| format!("reading trace {}", cli.trace.display()))?;
    let options = NormalizeOptions {
        duration_unit: cli.duration_unit,
    };
    let tree = parse_trace_with(&data, &options)
        .with_context(|| format!("parsing trace {}", cli.trace.display()))?;
    tracing::info!(calls = tree.len(), metric = %config.metric, "loaded trace");

    let graph = build_call_graph(&tree, &config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &graph)?;
            writeln!(out)?;
        }
        OutputFormat::Text => summary::write_summary(&graph, config.metric, &mut out)?,
    }
    Ok(())
}
