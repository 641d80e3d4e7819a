//! Paragraph model
//!
//! A paragraph owns an ordered sequence of runs. All offsets used by the
//! paragraph API are character offsets into the paragraph's *visible* text,
//! which is the concatenation of its text runs; marker runs are zero-width.

use crate::{Run, RunStyle};
use serde::{Deserialize, Serialize};

/// A paragraph block: optional named style plus ordered runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Named paragraph style (e.g. "Heading 1"), if any
    pub style: Option<String>,
    /// Ordered run sequence
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Create an empty paragraph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with a single plain text run
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            style: None,
            runs: vec![Run::text(text)],
        }
    }

    /// Create a styled paragraph with a single text run
    pub fn with_styled_text(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            style: None,
            runs: vec![Run::styled(text, style)],
        }
    }

    /// Set the named paragraph style
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Append a run
    pub fn push_run(&mut self, run: Run) {
        self.runs.push(run);
    }

    /// The visible text of this paragraph (marker runs contribute nothing)
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            out.push_str(run.visible_text());
        }
        out
    }

    /// Visible text length in characters
    pub fn char_len(&self) -> usize {
        self.runs.iter().map(|r| r.visible_len()).sum()
    }

    /// Whether the paragraph has no visible text and no markers
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Insert a run at a visible character offset, splitting a text run if
    /// the offset falls inside one. Marker runs already sitting at the
    /// offset are kept before the inserted run.
    pub fn insert_run_at(&mut self, offset: usize, run: Run) {
        let mut acc = 0usize;
        for i in 0..self.runs.len() {
            let len = self.runs[i].visible_len();
            if offset < acc + len {
                // Falls inside this text run: split it
                let within = offset - acc;
                if within == 0 {
                    self.runs.insert(i, run);
                } else if let Run::Text { text, style } = self.runs[i].clone() {
                    let byte = char_to_byte(&text, within);
                    let (head, tail) = text.split_at(byte);
                    self.runs[i] = Run::styled(head, style.clone());
                    self.runs.insert(i + 1, run);
                    self.runs.insert(i + 2, Run::styled(tail, style));
                }
                return;
            }
            acc += len;
        }
        self.runs.push(run);
    }

    /// Apply a style transform to the visible character range [start, end).
    /// Text runs are split at the range boundaries; marker runs are skipped.
    pub fn restyle_range(&mut self, start: usize, end: usize, f: impl Fn(&mut RunStyle)) {
        if start >= end {
            return;
        }
        let mut result: Vec<Run> = Vec::with_capacity(self.runs.len());
        let mut acc = 0usize;
        for run in self.runs.drain(..) {
            let len = run.visible_len();
            match run {
                Run::Text { text, style } if acc < end && acc + len > start => {
                    let lo = start.saturating_sub(acc).min(len);
                    let hi = (end - acc).min(len);
                    let lo_b = char_to_byte(&text, lo);
                    let hi_b = char_to_byte(&text, hi);
                    if lo > 0 {
                        result.push(Run::styled(&text[..lo_b], style.clone()));
                    }
                    let mut mid_style = style.clone();
                    f(&mut mid_style);
                    result.push(Run::styled(&text[lo_b..hi_b], mid_style));
                    if hi < len {
                        result.push(Run::styled(&text[hi_b..], style));
                    }
                }
                other => result.push(other),
            }
            acc += len;
        }
        self.runs = result;
    }

    /// Replace the visible character range [start, end) with plain text,
    /// removing any marker runs strictly inside the range. Returns the
    /// removed markers so callers can cascade registry deletes. The
    /// replacement inherits the style of the first text run it touches.
    pub fn replace_range(&mut self, start: usize, end: usize, replacement: &str) -> Vec<Run> {
        let mut removed_markers = Vec::new();
        let mut result: Vec<Run> = Vec::with_capacity(self.runs.len());
        let mut acc = 0usize;
        let mut inherited: Option<RunStyle> = None;
        let mut inserted = false;

        for run in self.runs.drain(..) {
            let len = run.visible_len();
            if len == 0 {
                // Zero-width marker: removed when strictly inside the range
                if acc > start && acc < end {
                    removed_markers.push(run);
                } else {
                    result.push(run);
                }
                continue;
            }
            if acc + len <= start || acc >= end {
                result.push(run);
                acc += len;
                continue;
            }
            // Overlapping text run
            if let Run::Text { text, style } = run {
                if inherited.is_none() {
                    inherited = Some(style.clone());
                }
                let lo = start.saturating_sub(acc).min(len);
                let hi = (end - acc).min(len);
                let lo_b = char_to_byte(&text, lo);
                let hi_b = char_to_byte(&text, hi);
                if lo > 0 {
                    result.push(Run::styled(&text[..lo_b], style.clone()));
                }
                if !inserted {
                    let style = inherited.clone().unwrap_or_default();
                    if !replacement.is_empty() {
                        result.push(Run::styled(replacement, style));
                    }
                    inserted = true;
                }
                if hi < len {
                    result.push(Run::styled(&text[hi_b..], style));
                }
            }
            acc += len;
        }

        if !inserted && !replacement.is_empty() {
            // Range was at the very end of the paragraph
            result.push(Run::text(replacement));
        }

        self.runs = result;
        self.normalize();
        removed_markers
    }

    /// Note reference markers contained in this paragraph
    pub fn note_refs(&self) -> impl Iterator<Item = (crate::NoteKind, u32)> + '_ {
        self.runs.iter().filter_map(|r| r.note_ref())
    }

    /// Merge adjacent text runs with identical styles and drop empty ones
    pub fn normalize(&mut self) {
        let mut result: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if let Run::Text { ref text, .. } = run {
                if text.is_empty() {
                    continue;
                }
            }
            match (result.last_mut(), &run) {
                (
                    Some(Run::Text {
                        text: prev,
                        style: prev_style,
                    }),
                    Run::Text { text, style },
                ) if prev_style == style => {
                    prev.push_str(text);
                }
                _ => result.push(run),
            }
        }
        self.runs = result;
    }
}

/// Convert a character offset into a byte offset within `text`
pub(crate) fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}
