//! Block-level content operations
//!
//! Inserting paragraphs, headings, lists, and page breaks, plus range
//! deletion and replace-between-anchors. All mutations go through the
//! edit guard, so a failing operation leaves the document unchanged.

use crate::{
    guarded_edit, resolve_one, Anchor, EditError, EditKind, EditOptions, Result,
};
use doc_model::{Block, BlockId, Document, Paragraph, TocProperties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where an insertion lands relative to its anchor block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Before,
    #[default]
    After,
    /// Remove the anchor block and splice the new content in its place
    Replace,
}

/// Append a styled paragraph to the end of the body
pub fn add_paragraph(
    doc: &mut Document,
    text: &str,
    style: Option<&str>,
    options: EditOptions,
) -> Result<BlockId> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let mut para = Paragraph::with_text(text);
        para.style = style.map(str::to_string);
        Ok(doc.push_block(Block::Paragraph(para)))
    })
}

/// Append a heading. Levels are clamped to 1..=9.
pub fn add_heading(
    doc: &mut Document,
    text: &str,
    level: u32,
    options: EditOptions,
) -> Result<BlockId> {
    let level = level.clamp(1, 9);
    add_paragraph(doc, text, Some(&format!("Heading {level}")), options)
}

/// Append a page break
pub fn add_page_break(doc: &mut Document, options: EditOptions) -> Result<BlockId> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        Ok(doc.push_block(Block::PageBreak))
    })
}

/// Append a table-of-contents block
pub fn add_table_of_contents(
    doc: &mut Document,
    levels: u32,
    title: Option<&str>,
    options: EditOptions,
) -> Result<BlockId> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let mut toc = TocProperties::default();
        toc.levels = levels.clamp(1, 9);
        if let Some(title) = title {
            toc.title = title.to_string();
        }
        Ok(doc.push_block(Block::TableOfContents(toc)))
    })
}

/// Insert a paragraph near an anchor
pub fn insert_paragraph_near(
    doc: &mut Document,
    anchor: &Anchor,
    position: InsertPosition,
    text: &str,
    style: Option<&str>,
    options: EditOptions,
) -> Result<BlockId> {
    let mut para = Paragraph::with_text(text);
    para.style = style.map(str::to_string);
    insert_blocks_near(doc, anchor, position, vec![Block::Paragraph(para)], options)
        .map(|ids| ids[0])
}

/// Insert a heading near an anchor
pub fn insert_heading_near(
    doc: &mut Document,
    anchor: &Anchor,
    position: InsertPosition,
    text: &str,
    level: u32,
    options: EditOptions,
) -> Result<BlockId> {
    let level = level.clamp(1, 9);
    insert_paragraph_near(
        doc,
        anchor,
        position,
        text,
        Some(&format!("Heading {level}")),
        options,
    )
}

/// Insert a bulleted or numbered list near an anchor, one paragraph per
/// item
pub fn insert_list_near(
    doc: &mut Document,
    anchor: &Anchor,
    position: InsertPosition,
    items: &[String],
    ordered: bool,
    options: EditOptions,
) -> Result<Vec<BlockId>> {
    if items.is_empty() {
        return Err(EditError::InvalidParameter(
            "list has no items".to_string(),
        ));
    }
    let style = if ordered { "List Number" } else { "List Bullet" };
    let blocks: Vec<Block> = items
        .iter()
        .map(|item| {
            let mut para = Paragraph::with_text(item);
            para.style = Some(style.to_string());
            Block::Paragraph(para)
        })
        .collect();
    insert_blocks_near(doc, anchor, position, blocks, options)
}

/// Insert arbitrary blocks near an anchor. The anchor must resolve to a
/// top-level body block.
pub fn insert_blocks_near(
    doc: &mut Document,
    anchor: &Anchor,
    position: InsertPosition,
    blocks: Vec<Block>,
    options: EditOptions,
) -> Result<Vec<BlockId>> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let resolved = resolve_one(doc, anchor)?;
        let index = top_level_index(doc, resolved.block_id)?;
        let at = match position {
            InsertPosition::Before => index,
            InsertPosition::After => index + 1,
            InsertPosition::Replace => {
                let removed = doc.remove_block_at(index)?;
                cascade_removed_markers(doc, &removed);
                index
            }
        };
        let mut ids = Vec::with_capacity(blocks.len());
        for (offset, block) in blocks.into_iter().enumerate() {
            ids.push(doc.insert_block_at(at + offset, block)?);
        }
        Ok(ids)
    })
}

/// Delete the block at a top-level body index, cascading registry entries
/// for any markers it contained
pub fn delete_block(doc: &mut Document, index: usize, options: EditOptions) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let removed = doc.remove_block_at(index)?;
        cascade_removed_markers(doc, &removed);
        Ok(())
    })
}

/// Delete everything from the start anchor's block through the end
/// anchor's block (inclusive). The start must resolve strictly before
/// the end in document order.
pub fn delete_range(
    doc: &mut Document,
    start: &Anchor,
    end: &Anchor,
    options: EditOptions,
) -> Result<()> {
    replace_between_anchors(doc, start, end, Vec::new(), options)?;
    Ok(())
}

/// Replace everything from the start anchor's block through the end
/// anchor's block (inclusive) with the given replacement blocks. The
/// start must resolve strictly before the end in document order.
pub fn replace_between_anchors(
    doc: &mut Document,
    start: &Anchor,
    end: &Anchor,
    replacement: Vec<Block>,
    options: EditOptions,
) -> Result<Vec<BlockId>> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let start_pos = resolve_one(doc, start)?;
        let end_pos = resolve_one(doc, end)?;
        let start_index = top_level_index(doc, start_pos.block_id)?;
        let end_index = top_level_index(doc, end_pos.block_id)?;
        if start_index >= end_index {
            return Err(EditError::InvalidRange(format!(
                "start anchor (block {start_index}) must precede end anchor (block {end_index})"
            )));
        }

        let mut removed = Vec::new();
        for index in (start_index..=end_index).rev() {
            removed.extend(doc.remove_block_at(index)?);
        }
        cascade_removed_markers(doc, &removed);

        let mut ids = Vec::with_capacity(replacement.len());
        for (offset, block) in replacement.into_iter().enumerate() {
            ids.push(doc.insert_block_at(start_index + offset, block)?);
        }
        Ok(ids)
    })
}

fn top_level_index(doc: &Document, block_id: BlockId) -> Result<usize> {
    doc.body_index_of(block_id).ok_or_else(|| {
        EditError::InvalidRange("anchor resolves inside a table cell".to_string())
    })
}

/// Remove registry entries for note markers in removed blocks, and close
/// out comment ranges that lost a marker. Entries are deleted with their
/// markers, never left orphaned.
pub(crate) fn cascade_removed_markers(doc: &mut Document, removed: &[Block]) {
    let mut note_ids = Vec::new();
    let mut comment_ids = BTreeSet::new();
    for block in removed {
        collect_markers(block, &mut note_ids, &mut comment_ids);
    }

    for (kind, id) in note_ids {
        doc.notes.remove_entry(kind, id);
    }

    // A comment with either marker removed loses the whole range
    for id in comment_ids {
        remove_comment_markers(doc, id);
        doc.comments.remove(id);
    }
}

fn collect_markers(
    block: &Block,
    note_ids: &mut Vec<(doc_model::NoteKind, u32)>,
    comment_ids: &mut BTreeSet<u32>,
) {
    match block {
        Block::Paragraph(para) => {
            for run in &para.runs {
                if let Some((kind, id)) = run.note_ref() {
                    note_ids.push((kind, id));
                }
                if let Some(id) = run.comment_marker() {
                    comment_ids.insert(id);
                }
            }
        }
        // Nested cell blocks arrive flattened as separate Paragraph
        // entries in the removed list
        _ => {}
    }
}

/// Strip every comment marker with the given id from the body
pub(crate) fn remove_comment_markers(doc: &mut Document, id: u32) {
    for para_id in doc.ordered_paragraphs() {
        if let Some(Block::Paragraph(para)) = doc.block_mut(para_id) {
            para.runs
                .retain(|run| run.comment_marker() != Some(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{NoteKind, Run, Template};

    fn doc_with(texts: &[&str]) -> Document {
        let mut doc = Document::from_template(Template::Blank);
        for t in texts {
            doc.push_block(Block::paragraph(*t));
        }
        doc
    }

    fn body_texts(doc: &Document) -> Vec<String> {
        doc.body()
            .iter()
            .filter_map(|&id| doc.block(id))
            .map(|b| b.visible_text())
            .collect()
    }

    #[test]
    fn test_add_paragraph_and_heading() {
        let mut doc = Document::from_template(Template::Blank);
        add_paragraph(&mut doc, "body", None, EditOptions::new()).unwrap();
        add_heading(&mut doc, "Title", 2, EditOptions::new()).unwrap();

        assert_eq!(doc.body_len(), 2);
        let heading = doc.block(doc.body()[1]).unwrap().as_paragraph().unwrap();
        assert_eq!(heading.style.as_deref(), Some("Heading 2"));
    }

    #[test]
    fn test_heading_level_clamped() {
        let mut doc = Document::from_template(Template::Blank);
        add_heading(&mut doc, "Deep", 17, EditOptions::new()).unwrap();
        let para = doc.block(doc.body()[0]).unwrap().as_paragraph().unwrap();
        assert_eq!(para.style.as_deref(), Some("Heading 9"));
    }

    #[test]
    fn test_insert_before_and_after_anchor() {
        let mut doc = doc_with(&["first", "last"]);
        insert_paragraph_near(
            &mut doc,
            &Anchor::text("last"),
            InsertPosition::Before,
            "middle",
            None,
            EditOptions::new(),
        )
        .unwrap();
        insert_paragraph_near(
            &mut doc,
            &Anchor::text("last"),
            InsertPosition::After,
            "coda",
            None,
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(body_texts(&doc), vec!["first", "middle", "last", "coda"]);
    }

    #[test]
    fn test_insert_replace_anchor() {
        let mut doc = doc_with(&["keep", "swap me", "keep too"]);
        insert_paragraph_near(
            &mut doc,
            &Anchor::text("swap me"),
            InsertPosition::Replace,
            "swapped",
            None,
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(body_texts(&doc), vec!["keep", "swapped", "keep too"]);
    }

    #[test]
    fn test_insert_list() {
        let mut doc = doc_with(&["intro"]);
        let items = vec!["one".to_string(), "two".to_string()];
        insert_list_near(
            &mut doc,
            &Anchor::index(0),
            InsertPosition::After,
            &items,
            true,
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(body_texts(&doc), vec!["intro", "one", "two"]);
        let para = doc.block(doc.body()[1]).unwrap().as_paragraph().unwrap();
        assert_eq!(para.style.as_deref(), Some("List Number"));
    }

    #[test]
    fn test_missing_anchor_leaves_doc_unchanged() {
        let mut doc = doc_with(&["only"]);
        let before = doc.clone();
        let err = insert_paragraph_near(
            &mut doc,
            &Anchor::text("missing"),
            InsertPosition::After,
            "x",
            None,
            EditOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::AnchorNotFound(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_replace_between_anchors() {
        let mut doc = doc_with(&["head", "START", "inner", "END", "tail"]);
        replace_between_anchors(
            &mut doc,
            &Anchor::text("START"),
            &Anchor::text("END"),
            vec![Block::paragraph("replaced")],
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(body_texts(&doc), vec!["head", "replaced", "tail"]);
    }

    #[test]
    fn test_delete_range_removes_span_inclusive() {
        let mut doc = doc_with(&["head", "START", "inner", "END", "tail"]);
        delete_range(
            &mut doc,
            &Anchor::text("START"),
            &Anchor::text("END"),
            EditOptions::new(),
        )
        .unwrap();
        assert_eq!(body_texts(&doc), vec!["head", "tail"]);
    }

    #[test]
    fn test_replace_between_reversed_anchors_fails() {
        let mut doc = doc_with(&["head", "END", "inner", "START", "tail"]);
        let before = doc.clone();
        let err = replace_between_anchors(
            &mut doc,
            &Anchor::text("START"),
            &Anchor::text("END"),
            vec![],
            EditOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidRange(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_cascading_note_delete() {
        let mut doc = doc_with(&["before", "noted text", "after"]);
        let id = doc.notes.add_entry(
            NoteKind::Footnote,
            vec![Block::paragraph("the note")],
        );
        if let Some(Block::Paragraph(para)) = doc.block_mut(doc.body()[1]) {
            para.push_run(Run::NoteRef {
                kind: NoteKind::Footnote,
                id,
            });
        }

        delete_block(&mut doc, 1, EditOptions::new()).unwrap();

        assert_eq!(body_texts(&doc), vec!["before", "after"]);
        assert!(!doc.notes.contains(NoteKind::Footnote, id));
        assert!(doc_model::integrity::validate(&doc).is_valid());
    }

    #[test]
    fn test_partial_comment_range_delete_removes_comment() {
        let mut doc = doc_with(&["first words", "second words"]);
        let id = doc.comments.add("Reviewer", "spans blocks");
        if let Some(Block::Paragraph(para)) = doc.block_mut(doc.body()[0]) {
            para.push_run(Run::CommentStart { id });
        }
        if let Some(Block::Paragraph(para)) = doc.block_mut(doc.body()[1]) {
            para.push_run(Run::CommentEnd { id });
        }

        delete_block(&mut doc, 0, EditOptions::new()).unwrap();

        assert!(!doc.comments.contains(id));
        assert!(doc.markers_in_order().is_empty());
        assert!(doc_model::integrity::validate(&doc).is_valid());
    }
}
