//! Read-only document queries: text, outline, and summary info

use crate::Result;
use doc_model::{Block, Document, NoteKind, ProtectionState};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// One heading in the document outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level, 1-based
    pub level: u32,
    pub text: String,
    /// Top-level body index of the heading block
    pub index: usize,
}

/// Summary counters and metadata for a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub created: chrono::DateTime<chrono::Utc>,
    pub modified: chrono::DateTime<chrono::Utc>,
    pub revision: u32,
    pub paragraphs: usize,
    pub tables: usize,
    pub words: usize,
    pub characters: usize,
    pub footnotes: usize,
    pub endnotes: usize,
    pub comments: usize,
    pub media: usize,
    pub protection: ProtectionState,
}

/// All visible text, one line per paragraph
pub fn document_text(doc: &Document) -> String {
    doc.text()
}

/// Heading paragraphs in body order. A paragraph is a heading when its
/// style is `Heading N`.
pub fn outline(doc: &Document) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    for (index, &id) in doc.body().iter().enumerate() {
        let Some(Block::Paragraph(para)) = doc.block(id) else {
            continue;
        };
        let Some(level) = para
            .style
            .as_deref()
            .and_then(|s| s.strip_prefix("Heading "))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        entries.push(OutlineEntry {
            level,
            text: para.text(),
            index,
        });
    }
    entries
}

/// Summary info for listings and the info operation
pub fn document_info(doc: &Document) -> DocumentInfo {
    let text = doc.text();
    let mut paragraphs = 0usize;
    let mut tables = 0usize;
    for id in doc.ordered_blocks() {
        match doc.block(id) {
            Some(Block::Paragraph(_)) => paragraphs += 1,
            Some(Block::Table(_)) => tables += 1,
            _ => {}
        }
    }
    DocumentInfo {
        title: doc.properties.title.clone(),
        author: doc.properties.author.clone(),
        created: doc.properties.created,
        modified: doc.properties.modified,
        revision: doc.properties.revision,
        paragraphs,
        tables,
        words: text.unicode_words().count(),
        characters: text.chars().filter(|c| *c != '\n').count(),
        footnotes: doc.notes.count(NoteKind::Footnote),
        endnotes: doc.notes.count(NoteKind::Endnote),
        comments: doc.comments.len(),
        media: doc.media.len(),
        protection: doc.protection_state(),
    }
}

/// Update core properties. Empty strings clear nothing; fields are only
/// written when given.
pub fn set_properties(
    doc: &mut Document,
    title: Option<&str>,
    author: Option<&str>,
) -> Result<()> {
    if let Some(title) = title {
        doc.properties.title = title.to_string();
    }
    if let Some(author) = author {
        doc.properties.author = author.to_string();
    }
    doc.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{add_heading, add_paragraph, add_table, EditOptions};
    use doc_model::Template;

    fn sample_doc() -> Document {
        let mut doc = Document::from_template(Template::Blank);
        add_heading(&mut doc, "Introduction", 1, EditOptions::new()).unwrap();
        add_paragraph(&mut doc, "Opening words here.", None, EditOptions::new()).unwrap();
        add_heading(&mut doc, "Details", 2, EditOptions::new()).unwrap();
        add_table(&mut doc, 2, 2, None, EditOptions::new()).unwrap();
        doc
    }

    #[test]
    fn test_outline_levels_and_order() {
        let doc = sample_doc();
        let entries = outline(&doc);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, 1);
        assert_eq!(entries[0].text, "Introduction");
        assert_eq!(entries[1].level, 2);
        assert_eq!(entries[1].index, 2);
    }

    #[test]
    fn test_document_info_counts() {
        let doc = sample_doc();
        let info = document_info(&doc);
        // Fresh table cells hold no paragraphs yet
        assert_eq!(info.paragraphs, 3);
        assert_eq!(info.tables, 1);
        assert_eq!(info.words, 5);
        assert_eq!(info.protection, ProtectionState::Unprotected);
    }

    #[test]
    fn test_set_properties() {
        let mut doc = sample_doc();
        let revision_before = doc.properties.revision;
        set_properties(&mut doc, Some("A Title"), None).unwrap();
        assert_eq!(doc.properties.title, "A Title");
        assert!(doc.properties.revision > revision_before);
    }
}
