use serde::{Deserialize, Serialize};

/// Configuration for building and rendering packet trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Width of one indentation level in the textual rendering.
    pub indent_size: usize,
    /// When `true`, a scalar-flagged property that has children in the
    /// enumeration is rejected as malformed instead of being built as a
    /// structure.
    pub strict_descriptors: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            indent_size: 5,
            strict_descriptors: false,
        }
    }
}

impl TreeConfig {
    /// A configuration that rejects any descriptor it would otherwise repair.
    pub fn strict() -> Self {
        Self {
            strict_descriptors: true,
            ..Default::default()
        }
    }

    /// Indentation width, never narrower than a glyph plus a space.
    pub(crate) fn indent_width(&self) -> usize {
        self.indent_size.max(2)
    }
}
