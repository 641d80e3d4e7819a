//! Inline run model
//!
//! A run is the smallest unit of paragraph content: either a span of text
//! with character formatting, or a special marker (note reference, picture
//! embed, comment range boundary). The variant set is closed and fixed by
//! the container format, so editing code matches on the variant directly.

use crate::NoteKind;
use serde::{Deserialize, Serialize};

/// Character formatting for a text run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font family name (inherits paragraph/style default when None)
    pub font_name: Option<String>,
    /// Font size in points
    pub font_size: Option<u32>,
    /// Text color as a hex string without '#', e.g. "FF0000"
    pub color: Option<String>,
}

impl RunStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, value: bool) -> Self {
        self.bold = value;
        self
    }

    pub fn italic(mut self, value: bool) -> Self {
        self.italic = value;
        self
    }

    pub fn underline(mut self, value: bool) -> Self {
        self.underline = value;
        self
    }

    pub fn font(mut self, name: impl Into<String>) -> Self {
        self.font_name = Some(name.into());
        self
    }

    pub fn size(mut self, points: u32) -> Self {
        self.font_size = Some(points);
        self
    }

    pub fn color(mut self, hex: impl Into<String>) -> Self {
        self.color = Some(hex.into());
        self
    }

    /// Check whether this style differs from the paragraph default
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A run of paragraph content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Run {
    /// A span of text with character formatting
    Text { text: String, style: RunStyle },
    /// A footnote or endnote reference marker, bound by id to a registry entry.
    /// The note kind serializes as "note" so it cannot collide with the
    /// variant tag.
    NoteRef {
        #[serde(rename = "note")]
        kind: NoteKind,
        id: u32,
    },
    /// An embedded picture, bound by relationship id to a media resource
    Picture { rel_id: String },
    /// Start of a comment range
    CommentStart { id: u32 },
    /// End of a comment range
    CommentEnd { id: u32 },
}

impl Run {
    /// Create a plain text run
    pub fn text(text: impl Into<String>) -> Self {
        Run::Text {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    /// Create a styled text run
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Run::Text {
            text: text.into(),
            style,
        }
    }

    /// The visible text this run contributes to its paragraph.
    /// Marker runs are invisible to text matching.
    pub fn visible_text(&self) -> &str {
        match self {
            Run::Text { text, .. } => text,
            _ => "",
        }
    }

    /// Length of the visible text in characters
    pub fn visible_len(&self) -> usize {
        self.visible_text().chars().count()
    }

    /// Whether this run is a marker (contributes no visible text)
    pub fn is_marker(&self) -> bool {
        !matches!(self, Run::Text { .. })
    }

    /// The note reference carried by this run, if any
    pub fn note_ref(&self) -> Option<(NoteKind, u32)> {
        match self {
            Run::NoteRef { kind, id } => Some((*kind, *id)),
            _ => None,
        }
    }

    /// The comment id carried by this run, if it is a range marker
    pub fn comment_marker(&self) -> Option<u32> {
        match self {
            Run::CommentStart { id } | Run::CommentEnd { id } => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text() {
        let run = Run::text("hello");
        assert_eq!(run.visible_text(), "hello");
        assert_eq!(run.visible_len(), 5);

        let marker = Run::NoteRef {
            kind: NoteKind::Footnote,
            id: 1,
        };
        assert_eq!(marker.visible_text(), "");
        assert!(marker.is_marker());
    }

    #[test]
    fn test_style_builder() {
        let style = RunStyle::new().bold(true).size(14).color("336699");
        assert!(style.bold);
        assert_eq!(style.font_size, Some(14));
        assert!(!style.is_plain());
        assert!(RunStyle::default().is_plain());
    }

    #[test]
    fn test_every_variant_roundtrips_through_json() {
        let runs = vec![
            Run::styled("bold bit", RunStyle::new().bold(true)),
            Run::NoteRef {
                kind: NoteKind::Footnote,
                id: 2,
            },
            Run::NoteRef {
                kind: NoteKind::Endnote,
                id: 9,
            },
            Run::Picture {
                rel_id: "rId4".to_string(),
            },
            Run::CommentStart { id: 11 },
            Run::CommentEnd { id: 11 },
        ];
        for run in runs {
            let json = serde_json::to_string(&run).unwrap();
            let back: Run = serde_json::from_str(&json).unwrap();
            assert_eq!(back, run);
        }
    }

    #[test]
    fn test_note_ref_wire_shape() {
        let run = Run::NoteRef {
            kind: NoteKind::Footnote,
            id: 3,
        };
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["kind"], "note_ref");
        assert_eq!(value["note"], "footnote");
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn test_marker_accessors() {
        let r = Run::NoteRef {
            kind: NoteKind::Endnote,
            id: 3,
        };
        assert_eq!(r.note_ref(), Some((NoteKind::Endnote, 3)));
        assert_eq!(Run::CommentStart { id: 7 }.comment_marker(), Some(7));
        assert_eq!(Run::text("x").comment_marker(), None);
    }
}
