//! Find and replace over visible text
//!
//! Matching accumulates visible text across run boundaries within each
//! paragraph. Bulk replacement consumes matches leftmost-first and
//! non-overlapping: after accepting a match, scanning resumes past its
//! end, so a pattern overlapping its own replacement is never rematched.

use crate::anchor::matches_in;
use crate::content_ops::remove_comment_markers;
use crate::{guarded_edit, EditError, EditKind, EditOptions, MatchOptions, Result};
use doc_model::{Block, BlockId, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single match of a find operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindMatch {
    pub block_id: BlockId,
    /// Paragraph ordinal in document order
    pub paragraph: usize,
    /// Match start, char offset into the paragraph's visible text
    pub start: usize,
    /// Match end (exclusive)
    pub end: usize,
    /// Surrounding text for preview
    pub context: String,
}

/// Outcome of a bulk replace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceSummary {
    pub replacements: usize,
    /// Paragraph ordinals that were touched
    pub paragraphs: Vec<usize>,
}

const CONTEXT_CHARS: usize = 20;

/// Find every occurrence of a pattern, in document order
pub fn find_text(
    doc: &Document,
    pattern: &str,
    options: &MatchOptions,
) -> Result<Vec<FindMatch>> {
    if pattern.is_empty() {
        return Err(EditError::InvalidParameter(
            "search pattern is empty".to_string(),
        ));
    }
    let mut out = Vec::new();
    for (paragraph, id) in doc.ordered_paragraphs().into_iter().enumerate() {
        let Some(Block::Paragraph(para)) = doc.block(id) else {
            continue;
        };
        let text = para.text();
        for (start, end) in non_overlapping(matches_in(&text, pattern, options)) {
            out.push(FindMatch {
                block_id: id,
                paragraph,
                start,
                end,
                context: context_around(&text, start, end),
            });
        }
    }
    Ok(out)
}

/// Replace every occurrence of a pattern. Replacement text inherits the
/// style of the first text run each match touches. Note markers strictly
/// inside a replaced span are deleted with their registry entries.
pub fn search_replace(
    doc: &mut Document,
    pattern: &str,
    replacement: &str,
    options: &MatchOptions,
    edit: EditOptions,
) -> Result<ReplaceSummary> {
    if pattern.is_empty() {
        return Err(EditError::InvalidParameter(
            "search pattern is empty".to_string(),
        ));
    }
    let search = *options;
    let pattern = pattern.to_string();
    let replacement = replacement.to_string();
    guarded_edit(doc, EditKind::Structural, edit, move |doc| {
        let mut summary = ReplaceSummary::default();
        let mut removed_markers = Vec::new();

        for (paragraph, id) in doc.ordered_paragraphs().into_iter().enumerate() {
            let Some(Block::Paragraph(para)) = doc.block_mut(id) else {
                continue;
            };
            let text = para.text();
            let matches = non_overlapping(matches_in(&text, &pattern, &search));
            if matches.is_empty() {
                continue;
            }
            // Right-to-left so earlier offsets stay valid
            for &(start, end) in matches.iter().rev() {
                removed_markers.extend(para.replace_range(start, end, &replacement));
            }
            summary.replacements += matches.len();
            summary.paragraphs.push(paragraph);
        }

        let mut comment_ids = BTreeSet::new();
        for run in removed_markers {
            if let Some((kind, note_id)) = run.note_ref() {
                doc.notes.remove_entry(kind, note_id);
            }
            if let Some(comment_id) = run.comment_marker() {
                comment_ids.insert(comment_id);
            }
        }
        for comment_id in comment_ids {
            remove_comment_markers(doc, comment_id);
            doc.comments.remove(comment_id);
        }

        Ok(summary)
    })
}

/// Find every match of a regular expression, in document order
pub fn find_regex(doc: &Document, pattern: &str) -> Result<Vec<FindMatch>> {
    let regex = compile(pattern)?;
    let mut out = Vec::new();
    for (paragraph, id) in doc.ordered_paragraphs().into_iter().enumerate() {
        let Some(Block::Paragraph(para)) = doc.block(id) else {
            continue;
        };
        let text = para.text();
        for m in regex.find_iter(&text) {
            let start = text[..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            out.push(FindMatch {
                block_id: id,
                paragraph,
                start,
                end,
                context: context_around(&text, start, end),
            });
        }
    }
    Ok(out)
}

/// Replace every regex match. `$1`-style capture references in the
/// replacement are expanded per match.
pub fn replace_regex(
    doc: &mut Document,
    pattern: &str,
    replacement: &str,
    edit: EditOptions,
) -> Result<ReplaceSummary> {
    let regex = compile(pattern)?;
    let replacement = replacement.to_string();
    guarded_edit(doc, EditKind::Structural, edit, move |doc| {
        let mut summary = ReplaceSummary::default();
        let mut removed_markers = Vec::new();

        for (paragraph, id) in doc.ordered_paragraphs().into_iter().enumerate() {
            let Some(Block::Paragraph(para)) = doc.block_mut(id) else {
                continue;
            };
            let text = para.text();
            let mut replacements: Vec<(usize, usize, String)> = Vec::new();
            for caps in regex.captures_iter(&text) {
                let Some(m) = caps.get(0) else {
                    continue;
                };
                if m.start() == m.end() {
                    continue;
                }
                let start = text[..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                let mut expanded = String::new();
                caps.expand(&replacement, &mut expanded);
                replacements.push((start, end, expanded));
            }
            if replacements.is_empty() {
                continue;
            }
            for (start, end, expanded) in replacements.iter().rev() {
                removed_markers.extend(para.replace_range(*start, *end, expanded));
            }
            summary.replacements += replacements.len();
            summary.paragraphs.push(paragraph);
        }

        let mut comment_ids = BTreeSet::new();
        for run in removed_markers {
            if let Some((kind, note_id)) = run.note_ref() {
                doc.notes.remove_entry(kind, note_id);
            }
            if let Some(comment_id) = run.comment_marker() {
                comment_ids.insert(comment_id);
            }
        }
        for comment_id in comment_ids {
            remove_comment_markers(doc, comment_id);
            doc.comments.remove(comment_id);
        }

        Ok(summary)
    })
}

fn compile(pattern: &str) -> Result<regex_lite::Regex> {
    regex_lite::Regex::new(pattern)
        .map_err(|e| EditError::InvalidParameter(format!("bad pattern: {e}")))
}

/// Keep leftmost matches, dropping any that overlap an accepted one
fn non_overlapping(matches: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::with_capacity(matches.len());
    for (start, end) in matches {
        if out.last().map(|&(_, prev_end)| start >= prev_end).unwrap_or(true) {
            out.push((start, end));
        }
    }
    out
}

fn context_around(text: &str, start: usize, end: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let from = start.saturating_sub(CONTEXT_CHARS);
    let to = (end + CONTEXT_CHARS).min(chars.len());
    chars[from..to].iter().collect()
}
