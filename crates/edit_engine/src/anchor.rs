//! Anchor resolution
//!
//! An anchor locates a point or range in a document, either positionally
//! (body index) or textually (pattern over visible text). Textual matching
//! accumulates visible text across run boundaries within a block, so a
//! pattern may span two adjacent runs. Resolved positions are valid only
//! for the duration of a single operation; the tree may be reshaped
//! between calls.

use crate::{EditError, Result};
use doc_model::{Block, BlockId, Document};
use serde::{Deserialize, Serialize};

/// Where to locate an edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    /// A top-level body position by index
    Index { index: usize },
    /// A textual match over visible block text
    Text {
        pattern: String,
        #[serde(default)]
        occurrence: Occurrence,
        #[serde(default)]
        options: MatchOptions,
    },
}

impl Anchor {
    pub fn index(index: usize) -> Self {
        Anchor::Index { index }
    }

    pub fn text(pattern: impl Into<String>) -> Self {
        Anchor::Text {
            pattern: pattern.into(),
            occurrence: Occurrence::default(),
            options: MatchOptions::default(),
        }
    }

    pub fn nth_text(pattern: impl Into<String>, n: usize) -> Self {
        Anchor::Text {
            pattern: pattern.into(),
            occurrence: Occurrence::Nth(n),
            options: MatchOptions::default(),
        }
    }
}

/// Which match a textual anchor selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    #[default]
    First,
    /// 1-based match ordinal
    Nth(usize),
    /// Every match; valid only for read and bulk operations
    All,
}

/// Normalization flags applied before textual comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Case-insensitive comparison
    #[serde(default)]
    pub ignore_case: bool,
    /// Treat any run of whitespace as a single space
    #[serde(default)]
    pub collapse_whitespace: bool,
    /// Match whole words only
    #[serde(default)]
    pub whole_word: bool,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(mut self, value: bool) -> Self {
        self.ignore_case = value;
        self
    }

    pub fn collapse_whitespace(mut self, value: bool) -> Self {
        self.collapse_whitespace = value;
        self
    }

    pub fn whole_word(mut self, value: bool) -> Self {
        self.whole_word = value;
        self
    }
}

/// A resolved anchor position: block plus a char offset range into its
/// visible text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAnchor {
    pub block_id: BlockId,
    /// Position of the block in document order (over all blocks, nested
    /// included)
    pub order: usize,
    /// Match start, char offset into the block's visible text
    pub start: usize,
    /// Match end (exclusive)
    pub end: usize,
}

/// Resolve an anchor to exactly one position. `Occurrence::All` is
/// rejected; single-target mutations must name one location.
pub fn resolve_one(doc: &Document, anchor: &Anchor) -> Result<ResolvedAnchor> {
    match anchor {
        Anchor::Index { index } => {
            let body = doc.body();
            let Some(&block_id) = body.get(*index) else {
                return Err(EditError::IndexOutOfRange {
                    index: *index,
                    len: body.len(),
                });
            };
            let order = doc
                .ordered_blocks()
                .iter()
                .position(|&id| id == block_id)
                .unwrap_or(*index);
            Ok(ResolvedAnchor {
                block_id,
                order,
                start: 0,
                end: 0,
            })
        }
        Anchor::Text {
            pattern,
            occurrence,
            options,
        } => {
            let matches = resolve_text(doc, pattern, options)?;
            match occurrence {
                Occurrence::First => matches
                    .into_iter()
                    .next()
                    .ok_or_else(|| EditError::AnchorNotFound(pattern.clone())),
                Occurrence::Nth(n) => {
                    if *n == 0 {
                        return Err(EditError::InvalidParameter(
                            "occurrence ordinal is 1-based".to_string(),
                        ));
                    }
                    matches
                        .into_iter()
                        .nth(n - 1)
                        .ok_or_else(|| EditError::AnchorNotFound(pattern.clone()))
                }
                Occurrence::All => Err(EditError::AmbiguousAnchor(format!(
                    "'{pattern}' with occurrence 'all' cannot target a single edit"
                ))),
            }
        }
    }
}

/// Every match of a textual pattern, in document order
pub fn resolve_text(
    doc: &Document,
    pattern: &str,
    options: &MatchOptions,
) -> Result<Vec<ResolvedAnchor>> {
    if pattern.is_empty() {
        return Err(EditError::InvalidParameter(
            "anchor pattern is empty".to_string(),
        ));
    }
    let mut out = Vec::new();
    for (order, block_id) in doc.ordered_blocks().into_iter().enumerate() {
        let Some(block) = doc.block(block_id) else {
            continue;
        };
        let Some(text) = block_visible_text(block) else {
            continue;
        };
        for (start, end) in matches_in(&text, pattern, options) {
            out.push(ResolvedAnchor {
                block_id,
                order,
                start,
                end,
            });
        }
    }
    Ok(out)
}

fn block_visible_text(block: &Block) -> Option<String> {
    match block {
        Block::Paragraph(p) => Some(p.text()),
        _ => None,
    }
}

/// Match positions as char offsets into the original (unnormalized) text.
/// Normalization is applied through an offset map so matches report
/// positions in the text as stored.
pub(crate) fn matches_in(text: &str, pattern: &str, options: &MatchOptions) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();

    // Normalized haystack with a map back to original char offsets
    let mut haystack = String::new();
    let mut offsets: Vec<usize> = Vec::new();
    let mut last_was_space = false;
    for (i, &c) in chars.iter().enumerate() {
        if options.collapse_whitespace && c.is_whitespace() {
            if last_was_space {
                continue;
            }
            haystack.push(' ');
            offsets.push(i);
            last_was_space = true;
        } else {
            for folded in fold(c, options) {
                haystack.push(folded);
                offsets.push(i);
            }
            last_was_space = false;
        }
    }

    let mut needle = String::new();
    let mut last_was_space = false;
    for c in pattern.chars() {
        if options.collapse_whitespace && c.is_whitespace() {
            if !last_was_space {
                needle.push(' ');
            }
            last_was_space = true;
        } else {
            needle.extend(fold(c, options));
            last_was_space = false;
        }
    }
    if needle.is_empty() {
        return Vec::new();
    }

    let hay_chars: Vec<char> = haystack.chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    let mut found = Vec::new();
    let mut i = 0usize;
    while i + needle_chars.len() <= hay_chars.len() {
        if hay_chars[i..i + needle_chars.len()] == needle_chars[..] {
            let ok = !options.whole_word
                || is_word_boundary(&hay_chars, i, i + needle_chars.len());
            if ok {
                let start = offsets[i];
                let end = offsets[i + needle_chars.len() - 1] + 1;
                found.push((start, end));
            }
        }
        i += 1;
    }
    found
}

fn fold(c: char, options: &MatchOptions) -> impl Iterator<Item = char> {
    let folded: Vec<char> = if options.ignore_case {
        c.to_lowercase().collect()
    } else {
        vec![c]
    };
    folded.into_iter()
}

fn is_word_boundary(chars: &[char], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !chars[start - 1].is_alphanumeric();
    let after_ok = end >= chars.len() || !chars[end].is_alphanumeric();
    before_ok && after_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Paragraph, Run, RunStyle, Template};

    fn doc_with(texts: &[&str]) -> Document {
        let mut doc = Document::from_template(Template::Blank);
        for t in texts {
            doc.push_block(Block::paragraph(*t));
        }
        doc
    }

    #[test]
    fn test_index_anchor_bounds() {
        let doc = doc_with(&["a", "b"]);
        assert!(resolve_one(&doc, &Anchor::index(1)).is_ok());
        let err = resolve_one(&doc, &Anchor::index(5)).unwrap_err();
        assert!(matches!(err, EditError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn test_text_anchor_first_match() {
        let doc = doc_with(&["alpha beta", "beta gamma"]);
        let r = resolve_one(&doc, &Anchor::text("beta")).unwrap();
        assert_eq!(r.order, 0);
        assert_eq!((r.start, r.end), (6, 10));
    }

    #[test]
    fn test_text_anchor_nth_match() {
        let doc = doc_with(&["alpha beta", "beta gamma"]);
        let r = resolve_one(&doc, &Anchor::nth_text("beta", 2)).unwrap();
        assert_eq!(r.order, 1);
        assert_eq!((r.start, r.end), (0, 4));
    }

    #[test]
    fn test_text_anchor_missing() {
        let doc = doc_with(&["alpha"]);
        let err = resolve_one(&doc, &Anchor::text("zeta")).unwrap_err();
        assert!(matches!(err, EditError::AnchorNotFound(_)));
    }

    #[test]
    fn test_all_rejected_for_single_target() {
        let doc = doc_with(&["x x x"]);
        let anchor = Anchor::Text {
            pattern: "x".to_string(),
            occurrence: Occurrence::All,
            options: MatchOptions::default(),
        };
        let err = resolve_one(&doc, &anchor).unwrap_err();
        assert!(matches!(err, EditError::AmbiguousAnchor(_)));
    }

    #[test]
    fn test_match_spans_run_boundary() {
        let mut doc = Document::from_template(Template::Blank);
        let mut para = Paragraph::new();
        para.push_run(Run::text("hel"));
        para.push_run(Run::styled("lo world", RunStyle::default().bold(true)));
        doc.push_block(Block::Paragraph(para));

        let r = resolve_one(&doc, &Anchor::text("hello")).unwrap();
        assert_eq!((r.start, r.end), (0, 5));
    }

    #[test]
    fn test_case_fold_and_whitespace_collapse() {
        let doc = doc_with(&["Hello\t  World"]);
        let options = MatchOptions::new().ignore_case(true).collapse_whitespace(true);
        let anchor = Anchor::Text {
            pattern: "hello world".to_string(),
            occurrence: Occurrence::First,
            options,
        };
        let r = resolve_one(&doc, &anchor).unwrap();
        assert_eq!(r.start, 0);
        assert_eq!(r.end, 13);
    }

    #[test]
    fn test_whole_word() {
        let m = matches_in("cat catalog cat", "cat", &MatchOptions::new().whole_word(true));
        assert_eq!(m, vec![(0, 3), (12, 15)]);
    }

    #[test]
    fn test_offsets_are_char_based() {
        let doc = doc_with(&["příliš žluťoučký"]);
        let r = resolve_one(&doc, &Anchor::text("žluťoučký")).unwrap();
        assert_eq!((r.start, r.end), (7, 16));
    }
}
