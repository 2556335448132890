pub mod normalize;

pub use normalize::{DurationUnit, NormalizeOptions, normalize_value};

use crate::model::CallTree;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse raw trace bytes with the default options.
pub fn parse_trace(data: &[u8]) -> Result<CallTree, TraceParseError> {
    parse_trace_with(data, &NormalizeOptions::default())
}

/// Parse raw trace bytes. Only non-JSON input is an error; any JSON shape is
/// normalized, possibly into an empty tree.
pub fn parse_trace_with(data: &[u8], options: &NormalizeOptions) -> Result<CallTree, TraceParseError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    Ok(normalize_value(&value, options))
}
