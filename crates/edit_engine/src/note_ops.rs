//! Footnote and endnote operations
//!
//! A note is a registry entry plus exactly one in-body marker run bound
//! to it by id. Every operation here maintains that pairing; the explicit
//! validate/repair pass is also exposed for callers holding documents of
//! unknown provenance.

use crate::{
    guarded_edit, resolve_one, Anchor, EditError, EditKind, EditOptions, Result,
};
use doc_model::integrity::{self, RepairMode, RepairSummary, ValidationReport};
use doc_model::{Block, Document, NoteKind, Paragraph, Run};
use serde::{Deserialize, Serialize};

/// Which side of a resolved text match a new marker lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPlacement {
    Before,
    #[default]
    After,
}

/// Add a note with its marker at the end of the nth top-level paragraph
pub fn add_note_at_paragraph(
    doc: &mut Document,
    kind: NoteKind,
    paragraph_index: usize,
    note_text: &str,
    options: EditOptions,
) -> Result<u32> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let para_id = doc.paragraph_at(paragraph_index)?;
        let id = doc
            .notes
            .add_entry(kind, note_content_from_text(note_text));
        if let Some(Block::Paragraph(para)) = doc.block_mut(para_id) {
            para.push_run(Run::NoteRef { kind, id });
        }
        Ok(id)
    })
}

/// Add a note with its marker adjacent to a text match
pub fn add_note_near_text(
    doc: &mut Document,
    kind: NoteKind,
    anchor: &Anchor,
    placement: MarkerPlacement,
    note_text: &str,
    options: EditOptions,
) -> Result<u32> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let resolved = resolve_one(doc, anchor)?;
        if resolved.start == resolved.end {
            return Err(EditError::InvalidRange(
                "marker placement needs a textual anchor".to_string(),
            ));
        }
        let offset = match placement {
            MarkerPlacement::Before => resolved.start,
            MarkerPlacement::After => resolved.end,
        };
        let id = doc
            .notes
            .add_entry(kind, note_content_from_text(note_text));
        let Some(Block::Paragraph(para)) = doc.block_mut(resolved.block_id) else {
            return Err(EditError::InvalidRange(
                "anchor does not resolve to a paragraph".to_string(),
            ));
        };
        para.insert_run_at(offset, Run::NoteRef { kind, id });
        Ok(id)
    })
}

/// Replace a note's content
pub fn update_note(
    doc: &mut Document,
    kind: NoteKind,
    id: u32,
    note_text: &str,
    options: EditOptions,
) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let entry = doc
            .notes
            .get_mut(kind, id)
            .ok_or(doc_model::DocModelError::NoteNotFound { kind, id })
            .map_err(EditError::from)?;
        entry.content = note_content_from_text(note_text);
        Ok(())
    })
}

/// Delete a note: entry and marker together
pub fn delete_note(
    doc: &mut Document,
    kind: NoteKind,
    id: u32,
    options: EditOptions,
) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        if doc.notes.remove_entry(kind, id).is_none() {
            return Err(EditError::from(doc_model::DocModelError::NoteNotFound {
                kind,
                id,
            }));
        }
        for para_id in doc.ordered_paragraphs() {
            if let Some(Block::Paragraph(para)) = doc.block_mut(para_id) {
                para.runs
                    .retain(|run| run.note_ref() != Some((kind, id)));
            }
        }
        Ok(())
    })
}

/// Read a note's visible text
pub fn note_text(doc: &Document, kind: NoteKind, id: u32) -> Result<String> {
    doc.notes
        .get(kind, id)
        .map(|entry| entry.text())
        .ok_or_else(|| EditError::from(doc_model::DocModelError::NoteNotFound { kind, id }))
}

/// Convert every footnote into an endnote. Each footnote receives a
/// fresh endnote id; its marker is rebound in place. Footnote ids are
/// retired, never reused.
pub fn convert_footnotes_to_endnotes(
    doc: &mut Document,
    options: EditOptions,
) -> Result<usize> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let footnotes: Vec<u32> = doc
            .notes
            .entries(NoteKind::Footnote)
            .iter()
            .map(|e| e.id)
            .collect();

        let mut converted = 0usize;
        for old_id in footnotes {
            let Some(entry) = doc.notes.remove_entry(NoteKind::Footnote, old_id) else {
                continue;
            };
            let new_id = doc.notes.add_entry(NoteKind::Endnote, entry.content);
            for para_id in doc.ordered_paragraphs() {
                if let Some(Block::Paragraph(para)) = doc.block_mut(para_id) {
                    for run in &mut para.runs {
                        if run.note_ref() == Some((NoteKind::Footnote, old_id)) {
                            *run = Run::NoteRef {
                                kind: NoteKind::Endnote,
                                id: new_id,
                            };
                        }
                    }
                }
            }
            converted += 1;
        }
        Ok(converted)
    })
}

/// The explicit validation pass, exposed as its own callable operation
pub fn validate_document(doc: &Document) -> ValidationReport {
    integrity::validate(doc)
}

/// The explicit repair pass. Repair itself bypasses the integrity gate
/// in the guard (its whole point is to start from an invalid document),
/// but still honors protection state and atomicity.
pub fn repair_document(
    doc: &mut Document,
    mode: RepairMode,
    options: EditOptions,
) -> Result<RepairSummary> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        Ok(integrity::repair(doc, mode))
    })
}

/// Paragraph text excerpt shown alongside a note in listings
pub fn marker_paragraph_text(doc: &Document, kind: NoteKind, id: u32) -> Option<String> {
    for (para_id, _, run) in doc.markers_in_order() {
        if run.note_ref() == Some((kind, id)) {
            if let Some(Block::Paragraph(para)) = doc.block(para_id) {
                return Some(para.text());
            }
        }
    }
    None
}

/// Build the body of a note from raw text, one paragraph per line
pub fn note_content_from_text(text: &str) -> Vec<Block> {
    if text.is_empty() {
        return vec![Block::Paragraph(Paragraph::new())];
    }
    text.lines().map(Block::paragraph).collect()
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
    fn test_add_note_at_paragraph() {
        let mut doc = doc_with(&["first", "second"]);
        let id = add_note_at_paragraph(
            &mut doc,
            NoteKind::Footnote,
            1,
            "a note",
            EditOptions::new(),
        )
        .unwrap();

        assert_eq!(id, 1);
        assert_eq!(note_text(&doc, NoteKind::Footnote, id).unwrap(), "a note");
        assert_eq!(
            marker_paragraph_text(&doc, NoteKind::Footnote, id).as_deref(),
            Some("second")
        );
        assert!(integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_add_note_near_text() {
        let mut doc = doc_with(&["claim needing a citation here"]);
        let id = add_note_near_text(
            &mut doc,
            NoteKind::Footnote,
            &Anchor::text("citation"),
            MarkerPlacement::After,
            "see source",
            EditOptions::new(),
        )
        .unwrap();

        let para = doc.block(doc.body()[0]).unwrap().as_paragraph().unwrap();
        let marker_pos = para
            .runs
            .iter()
            .position(|r| r.note_ref() == Some((NoteKind::Footnote, id)))
            .unwrap();
        // Marker sits between "citation" and " here"
        assert!(matches!(&para.runs[marker_pos - 1], Run::Text { text, .. } if text.ends_with("citation")));
        assert!(integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_ids_monotonic_across_delete() {
        let mut doc = doc_with(&["one", "two", "three"]);
        let a = add_note_at_paragraph(&mut doc, NoteKind::Footnote, 0, "a", EditOptions::new())
            .unwrap();
        let b = add_note_at_paragraph(&mut doc, NoteKind::Footnote, 1, "b", EditOptions::new())
            .unwrap();
        delete_note(&mut doc, NoteKind::Footnote, b, EditOptions::new()).unwrap();
        let c = add_note_at_paragraph(&mut doc, NoteKind::Footnote, 2, "c", EditOptions::new())
            .unwrap();

        assert_eq!((a, b, c), (1, 2, 3));
        assert!(integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_update_missing_note_fails() {
        let mut doc = doc_with(&["text"]);
        let err = update_note(&mut doc, NoteKind::Endnote, 7, "x", EditOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EditError::DocModel(doc_model::DocModelError::NoteNotFound { .. })
        ));
    }

    #[test]
    fn test_convert_footnotes_to_endnotes() {
        let mut doc = doc_with(&["alpha", "beta"]);
        add_note_at_paragraph(&mut doc, NoteKind::Footnote, 0, "f1", EditOptions::new())
            .unwrap();
        add_note_at_paragraph(&mut doc, NoteKind::Footnote, 1, "f2", EditOptions::new())
            .unwrap();

        let converted =
            convert_footnotes_to_endnotes(&mut doc, EditOptions::new()).unwrap();

        assert_eq!(converted, 2);
        assert_eq!(doc.notes.count(NoteKind::Footnote), 0);
        assert_eq!(doc.notes.count(NoteKind::Endnote), 2);
        assert!(integrity::validate(&doc).is_valid());
        assert_eq!(
            note_text(&doc, NoteKind::Endnote, 1).unwrap(),
            "f1"
        );
    }

    #[test]
    fn test_repair_operation_on_broken_document() {
        let mut doc = doc_with(&["text"]);
        doc.notes.insert_loaded(
            NoteKind::Footnote,
            doc_model::NoteEntry::with_text(3, "orphan"),
        );
        assert!(!validate_document(&doc).is_valid());

        let summary =
            repair_document(&mut doc, RepairMode::default(), EditOptions::new()).unwrap();
        assert!(!summary.is_clean());
        assert!(validate_document(&doc).is_valid());
    }

    #[test]
    fn test_note_content_from_text_multiline() {
        let blocks = note_content_from_text("line one\nline two");
        assert_eq!(blocks.len(), 2);
    }
}
