//! Character and paragraph formatting operations

use crate::{guarded_edit, resolve_one, Anchor, EditError, EditKind, EditOptions, Result};
use doc_model::{Block, Document, NamedStyle, RunStyle};
use serde::{Deserialize, Serialize};

/// A partial formatting change; unset fields leave the run untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl FormatPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, value: bool) -> Self {
        self.bold = Some(value);
        self
    }

    pub fn italic(mut self, value: bool) -> Self {
        self.italic = Some(value);
        self
    }

    pub fn underline(mut self, value: bool) -> Self {
        self.underline = Some(value);
        self
    }

    pub fn is_noop(&self) -> bool {
        self == &Self::default()
    }

    fn apply(&self, style: &mut RunStyle) {
        if let Some(b) = self.bold {
            style.bold = b;
        }
        if let Some(i) = self.italic {
            style.italic = i;
        }
        if let Some(u) = self.underline {
            style.underline = u;
        }
        if let Some(name) = &self.font_name {
            style.font_name = Some(name.clone());
        }
        if let Some(size) = self.font_size {
            style.font_size = Some(size);
        }
        if let Some(color) = &self.color {
            style.color = Some(color.clone());
        }
    }
}

/// Apply character formatting to the text matched by an anchor. The
/// anchor must be textual; the match range within its paragraph is
/// restyled, splitting runs at the boundaries.
pub fn format_text(
    doc: &mut Document,
    anchor: &Anchor,
    patch: &FormatPatch,
    options: EditOptions,
) -> Result<()> {
    if patch.is_noop() {
        return Err(EditError::InvalidParameter(
            "formatting patch sets no fields".to_string(),
        ));
    }
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let resolved = resolve_one(doc, anchor)?;
        if resolved.start == resolved.end {
            return Err(EditError::InvalidRange(
                "anchor does not select a text range".to_string(),
            ));
        }
        let Some(Block::Paragraph(para)) = doc.block_mut(resolved.block_id) else {
            return Err(EditError::InvalidRange(
                "anchor does not resolve to a paragraph".to_string(),
            ));
        };
        para.restyle_range(resolved.start, resolved.end, |style| patch.apply(style));
        para.normalize();
        Ok(())
    })
}

/// Set or clear the named paragraph style of the block at an anchor
pub fn set_paragraph_style(
    doc: &mut Document,
    anchor: &Anchor,
    style: Option<&str>,
    options: EditOptions,
) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let resolved = resolve_one(doc, anchor)?;
        let Some(Block::Paragraph(para)) = doc.block_mut(resolved.block_id) else {
            return Err(EditError::InvalidRange(
                "anchor does not resolve to a paragraph".to_string(),
            ));
        };
        para.style = style.map(str::to_string);
        Ok(())
    })
}

/// Register a named character style, optionally inheriting from a base
/// style. Re-registering an existing name overwrites it.
pub fn create_custom_style(
    doc: &mut Document,
    name: &str,
    base: Option<&str>,
    font: RunStyle,
    options: EditOptions,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EditError::InvalidParameter(
            "style name is empty".to_string(),
        ));
    }
    if let Some(base) = base {
        if !doc.styles.contains_key(base) {
            return Err(EditError::InvalidParameter(format!(
                "base style '{base}' does not exist"
            )));
        }
    }
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let mut style = NamedStyle::new(font.clone());
        if let Some(base) = base {
            style = style.with_base(base);
        }
        doc.styles.insert(name.to_string(), style);
        Ok(())
    })
}

/// Resolve a named style's effective font, walking the base chain.
/// Lookup is bounded to avoid cycles introduced by loaded documents.
pub fn effective_font(doc: &Document, name: &str) -> Option<RunStyle> {
    let mut chain = Vec::new();
    let mut current = Some(name.to_string());
    while let Some(n) = current {
        if chain.len() > 16 || chain.contains(&n) {
            break;
        }
        chain.push(n);
        current = doc
            .styles
            .get(chain.last()?.as_str())
            .and_then(|s| s.base.clone());
    }

    let mut font: Option<RunStyle> = None;
    for n in chain.iter().rev() {
        let style = doc.styles.get(n)?;
        let mut merged = font.unwrap_or_default();
        let f = &style.font;
        if f.bold {
            merged.bold = true;
        }
        if f.italic {
            merged.italic = true;
        }
        if f.underline {
            merged.underline = true;
        }
        if f.font_name.is_some() {
            merged.font_name = f.font_name.clone();
        }
        if f.font_size.is_some() {
            merged.font_size = f.font_size;
        }
        if f.color.is_some() {
            merged.color = f.color.clone();
        }
        font = Some(merged);
    }
    font
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Run, Template};

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph(text));
        doc
    }

    #[test]
    fn test_format_text_splits_runs() {
        let mut doc = doc_with("make this bold please");
        format_text(
            &mut doc,
            &Anchor::text("this bold"),
            &FormatPatch::new().bold(true),
            EditOptions::new(),
        )
        .unwrap();

        let para = doc.block(doc.body()[0]).unwrap().as_paragraph().unwrap();
        let bold_text: String = para
            .runs
            .iter()
            .filter_map(|r| match r {
                Run::Text { text, style } if style.bold => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(bold_text, "this bold");
        assert_eq!(para.text(), "make this bold please");
    }

    #[test]
    fn test_noop_patch_rejected() {
        let mut doc = doc_with("text");
        let err = format_text(
            &mut doc,
            &Anchor::text("text"),
            &FormatPatch::new(),
            EditOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter(_)));
    }

    #[test]
    fn test_index_anchor_rejected_for_character_format() {
        let mut doc = doc_with("text");
        let err = format_text(
            &mut doc,
            &Anchor::index(0),
            &FormatPatch::new().bold(true),
            EditOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidRange(_)));
    }

    #[test]
    fn test_set_paragraph_style() {
        let mut doc = doc_with("quoted text");
        set_paragraph_style(
            &mut doc,
            &Anchor::index(0),
            Some("Quote"),
            EditOptions::new(),
        )
        .unwrap();
        let para = doc.block(doc.body()[0]).unwrap().as_paragraph().unwrap();
        assert_eq!(para.style.as_deref(), Some("Quote"));
    }

    #[test]
    fn test_custom_style_with_missing_base_rejected() {
        let mut doc = doc_with("text");
        let err = create_custom_style(
            &mut doc,
            "Callout",
            Some("NoSuchBase"),
            RunStyle::default(),
            EditOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter(_)));
    }

    #[test]
    fn test_effective_font_walks_base_chain() {
        let mut doc = doc_with("text");
        create_custom_style(
            &mut doc,
            "Base",
            None,
            RunStyle::default().bold(true),
            EditOptions::new(),
        )
        .unwrap();
        create_custom_style(
            &mut doc,
            "Derived",
            Some("Base"),
            RunStyle::default().italic(true),
            EditOptions::new(),
        )
        .unwrap();

        let font = effective_font(&doc, "Derived").unwrap();
        assert!(font.bold);
        assert!(font.italic);
    }
}
