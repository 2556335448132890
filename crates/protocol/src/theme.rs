use serde::{Deserialize, Serialize};

/// Semantic color class of a graph node, resolved by the renderer's theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorClass {
    /// Top of the call tree. Drawn with a fixed size and neutral color.
    Root,
    UserFunction,
    InternalFunction,
    Method,
}

impl ColorClass {
    /// CSS-style class name used by web renderers.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Root => "node-root",
            Self::UserFunction => "node-user",
            Self::InternalFunction => "node-internal",
            Self::Method => "node-method",
        }
    }
}
