use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metrics::Metric;
use crate::model::FunctionType;

pub const DEFAULT_MIN_PERCENTAGE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid graph config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Degenerate-result guard applied after percentage filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackPolicy {
    /// How many non-root groups to force in when the result is degenerate.
    #[serde(alias = "max_forced_groups")]
    pub max_forced_groups: usize,
    /// A result with this many groups or fewer counts as degenerate.
    #[serde(alias = "degenerate_group_count")]
    pub degenerate_group_count: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            max_forced_groups: 10,
            degenerate_group_count: 2,
        }
    }
}

/// Which function types take part in grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub user: bool,
    pub internal: bool,
    pub methods: bool,
}

impl Visibility {
    /// Unknown types are shown and hidden together with user functions.
    pub fn allows(self, function_type: FunctionType) -> bool {
        match function_type {
            FunctionType::User | FunctionType::Unknown => self.user,
            FunctionType::Internal => self.internal,
            FunctionType::Method => self.methods,
        }
    }
}

/// Everything that shapes one graph computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
    pub metric: Metric,
    #[serde(alias = "min_percentage")]
    pub min_percentage: f64,
    #[serde(alias = "show_user_functions")]
    pub show_user_functions: bool,
    #[serde(alias = "show_internal_functions")]
    pub show_internal_functions: bool,
    #[serde(alias = "show_methods")]
    pub show_methods: bool,
    pub fallback: FallbackPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            min_percentage: DEFAULT_MIN_PERCENTAGE,
            show_user_functions: true,
            show_internal_functions: true,
            show_methods: true,
            fallback: FallbackPolicy::default(),
        }
    }
}

impl GraphConfig {
    pub fn with_metric(metric: Metric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// Parse a config as sent by the UI. Absent fields take defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(data)?;
        Ok(config)
    }

    pub fn visibility(&self) -> Visibility {
        Visibility {
            user: self.show_user_functions,
            internal: self.show_internal_functions,
            methods: self.show_methods,
        }
    }

    /// Threshold actually applied: negative or NaN inputs mean "no threshold".
    pub fn effective_min_percentage(&self) -> f64 {
        if self.min_percentage.is_nan() || self.min_percentage < 0.0 {
            tracing::warn!(
                min_percentage = self.min_percentage,
                "invalid minimum percentage, using 0"
            );
            0.0
        } else {
            self.min_percentage
        }
    }
}
