//! Named character styles

use crate::RunStyle;
use serde::{Deserialize, Serialize};

/// A named character style that paragraphs and operations can reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedStyle {
    /// Style this one inherits from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Character formatting carried by the style
    pub font: RunStyle,
}

impl NamedStyle {
    pub fn new(font: RunStyle) -> Self {
        Self { base: None, font }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}
