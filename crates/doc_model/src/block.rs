//! Block model
//!
//! Top-level document content is an ordered sequence of blocks. The variant
//! set is closed and fixed by the container format; editing code matches on
//! the variant rather than relying on dynamic dispatch.

use crate::{Paragraph, Table};
use serde::{Deserialize, Serialize};

/// Properties of a generated table of contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocProperties {
    /// Heading levels included (1..=levels)
    pub levels: u32,
    /// Caption shown above the listing
    pub title: String,
}

impl Default for TocProperties {
    fn default() -> Self {
        Self {
            levels: 3,
            title: "Table of Contents".to_string(),
        }
    }
}

/// A top-level (or cell-level) document block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    PageBreak,
    TableOfContents(TocProperties),
}

impl Block {
    /// Shorthand for a paragraph block with plain text
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(Paragraph::with_text(text))
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Visible text contributed by this block alone (tables excluded;
    /// their text lives in their cells' own blocks)
    pub fn visible_text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_shorthand() {
        let block = Block::paragraph("hi");
        assert_eq!(block.visible_text(), "hi");
        assert!(block.as_paragraph().is_some());
        assert!(block.as_table().is_none());
    }

    #[test]
    fn test_non_paragraph_has_no_text() {
        assert_eq!(Block::PageBreak.visible_text(), "");
        assert_eq!(
            Block::TableOfContents(TocProperties::default()).visible_text(),
            ""
        );
    }
}
