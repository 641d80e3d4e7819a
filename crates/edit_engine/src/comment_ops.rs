//! Comment operations
//!
//! A comment is a store entry plus a start/end marker pair bracketing a
//! span of body text. Extraction is read-only and filterable; adding and
//! deleting comments is gated as a comment edit, which restricted-editing
//! documents may still permit.

use crate::{
    guarded_edit, resolve_one, Anchor, EditError, EditKind, EditOptions, Result,
};
use doc_model::{Block, Document, Run};
use serde::{Deserialize, Serialize};

/// A comment joined with the text span it annotates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedComment {
    pub id: u32,
    pub author: String,
    pub initials: String,
    pub text: String,
    pub date: chrono::DateTime<chrono::Utc>,
    /// Paragraph ordinal of the range start, if the markers are present
    pub paragraph: Option<usize>,
    /// The annotated text between the range markers
    pub annotated_text: Option<String>,
}

/// Annotate the span matched by an anchor with a new comment
pub fn add_comment(
    doc: &mut Document,
    anchor: &Anchor,
    author: &str,
    text: &str,
    options: EditOptions,
) -> Result<u32> {
    if author.trim().is_empty() {
        return Err(EditError::InvalidParameter(
            "comment author is empty".to_string(),
        ));
    }
    guarded_edit(doc, EditKind::Comment, options, |doc| {
        let resolved = resolve_one(doc, anchor)?;
        if resolved.start == resolved.end {
            return Err(EditError::InvalidRange(
                "comment needs a textual anchor selecting a span".to_string(),
            ));
        }
        let id = doc.comments.add(author, text);
        let Some(Block::Paragraph(para)) = doc.block_mut(resolved.block_id) else {
            return Err(EditError::InvalidRange(
                "anchor does not resolve to a paragraph".to_string(),
            ));
        };
        // End first so the start offset stays valid
        para.insert_run_at(resolved.end, Run::CommentEnd { id });
        para.insert_run_at(resolved.start, Run::CommentStart { id });
        Ok(id)
    })
}

/// Remove a comment and its range markers
pub fn delete_comment(doc: &mut Document, id: u32, options: EditOptions) -> Result<()> {
    guarded_edit(doc, EditKind::Comment, options, |doc| {
        if doc.comments.remove(id).is_none() {
            return Err(EditError::InvalidParameter(format!(
                "comment {id} does not exist"
            )));
        }
        crate::content_ops::remove_comment_markers(doc, id);
        Ok(())
    })
}

/// Every comment with its annotated span, in store order
pub fn extract_comments(doc: &Document) -> Vec<ExtractedComment> {
    doc.comments
        .all()
        .iter()
        .map(|c| {
            let (paragraph, annotated_text) = annotated_span(doc, c.id);
            ExtractedComment {
                id: c.id,
                author: c.author.clone(),
                initials: c.initials.clone(),
                text: c.text.clone(),
                date: c.date,
                paragraph,
                annotated_text,
            }
        })
        .collect()
}

/// Comments by a single author, matched case-insensitively
pub fn extract_comments_by_author(doc: &Document, author: &str) -> Vec<ExtractedComment> {
    let wanted = author.to_lowercase();
    extract_comments(doc)
        .into_iter()
        .filter(|c| c.author.to_lowercase() == wanted)
        .collect()
}

/// Comments whose range starts in the given top-level paragraph
pub fn extract_comments_for_paragraph(
    doc: &Document,
    paragraph_index: usize,
) -> Result<Vec<ExtractedComment>> {
    doc.paragraph_at(paragraph_index).map_err(EditError::from)?;
    Ok(extract_comments(doc)
        .into_iter()
        .filter(|c| c.paragraph == Some(paragraph_index))
        .collect())
}

/// Locate a comment's range: starting paragraph ordinal plus the visible
/// text between its markers
fn annotated_span(doc: &Document, id: u32) -> (Option<usize>, Option<String>) {
    let mut start: Option<(usize, usize)> = None;
    let mut end: Option<(usize, usize)> = None;

    for (para_ordinal, para_id) in doc.ordered_paragraphs().into_iter().enumerate() {
        let Some(Block::Paragraph(para)) = doc.block(para_id) else {
            continue;
        };
        let mut offset = 0usize;
        for run in &para.runs {
            match run {
                Run::CommentStart { id: i } if *i == id => {
                    start = Some((para_ordinal, offset));
                }
                Run::CommentEnd { id: i } if *i == id => {
                    end = Some((para_ordinal, offset));
                }
                _ => {}
            }
            offset += run.visible_len();
        }
    }

    let (Some((start_para, start_off)), Some((end_para, end_off))) = (start, end) else {
        return (start.map(|(p, _)| p), None);
    };

    let paragraphs = doc.ordered_paragraphs();
    let mut pieces = Vec::new();
    for ordinal in start_para..=end_para {
        let Some(Block::Paragraph(para)) = paragraphs.get(ordinal).and_then(|&id| doc.block(id))
        else {
            continue;
        };
        let text = para.text();
        let chars: Vec<char> = text.chars().collect();
        let from = if ordinal == start_para { start_off } else { 0 };
        let to = if ordinal == end_para { end_off } else { chars.len() };
        if from <= to && to <= chars.len() {
            pieces.push(chars[from..to].iter().collect::<String>());
        }
    }
    (Some(start_para), Some(pieces.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::Template;

    fn doc_with(texts: &[&str]) -> Document {
        let mut doc = Document::from_template(Template::Blank);
        for t in texts {
            doc.push_block(Block::paragraph(*t));
        }
        doc
    }

    #[test]
    fn test_add_and_extract_comment() {
        let mut doc = doc_with(&["the disputed claim stands"]);
        let id = add_comment(
            &mut doc,
            &Anchor::text("disputed claim"),
            "Ada Reviewer",
            "needs a source",
            EditOptions::new(),
        )
        .unwrap();

        let comments = extract_comments(&doc);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, id);
        assert_eq!(comments[0].initials, "AR");
        assert_eq!(comments[0].paragraph, Some(0));
        assert_eq!(comments[0].annotated_text.as_deref(), Some("disputed claim"));
        assert!(doc_model::integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_extract_by_author() {
        let mut doc = doc_with(&["one two three four"]);
        add_comment(&mut doc, &Anchor::text("one"), "Ada", "a", EditOptions::new()).unwrap();
        add_comment(&mut doc, &Anchor::text("two"), "Grace", "b", EditOptions::new()).unwrap();
        add_comment(&mut doc, &Anchor::text("three"), "ada", "c", EditOptions::new()).unwrap();

        let by_ada = extract_comments_by_author(&doc, "ADA");
        assert_eq!(by_ada.len(), 2);
        assert!(by_ada.iter().all(|c| c.author.to_lowercase() == "ada"));
    }

    #[test]
    fn test_extract_for_paragraph() {
        let mut doc = doc_with(&["first paragraph", "second paragraph"]);
        add_comment(
            &mut doc,
            &Anchor::nth_text("paragraph", 2),
            "Ada",
            "here",
            EditOptions::new(),
        )
        .unwrap();

        assert!(extract_comments_for_paragraph(&doc, 0).unwrap().is_empty());
        let second = extract_comments_for_paragraph(&doc, 1).unwrap();
        assert_eq!(second.len(), 1);

        let err = extract_comments_for_paragraph(&doc, 9).unwrap_err();
        assert!(matches!(err, EditError::IndexOutOfRange { .. }));
    }

    #[test]
    fn test_delete_comment_removes_markers() {
        let mut doc = doc_with(&["annotated text"]);
        let id = add_comment(
            &mut doc,
            &Anchor::text("annotated"),
            "Ada",
            "gone soon",
            EditOptions::new(),
        )
        .unwrap();

        delete_comment(&mut doc, id, EditOptions::new()).unwrap();
        assert!(extract_comments(&doc).is_empty());
        assert!(doc.markers_in_order().is_empty());
        assert!(doc_model::integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_comments_allowed_under_restriction() {
        let mut doc = doc_with(&["restricted body"]);
        doc.protection
            .protect(
                "pw",
                Some(doc_model::protection::RestrictionSet::comments_only()),
            )
            .unwrap();

        add_comment(
            &mut doc,
            &Anchor::text("restricted"),
            "Ada",
            "still allowed",
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(extract_comments(&doc).len(), 1);
    }
}
