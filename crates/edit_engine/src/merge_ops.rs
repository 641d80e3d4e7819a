//! Document merging
//!
//! Appends the body of one or more source documents to a target. Note,
//! comment, and relationship ids are remapped into the target's id
//! spaces, so merged content never collides with existing entries and
//! every marker stays bound to its entry.

use crate::{guarded_edit, EditKind, EditOptions, Result};
use doc_model::{Block, Document, Run, Table};
use std::collections::BTreeMap;

/// Append `source`'s body to `doc`, optionally separated by a page break.
/// Returns the number of top-level blocks appended.
pub fn merge_document(
    doc: &mut Document,
    source: &Document,
    page_break_between: bool,
    options: EditOptions,
) -> Result<usize> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        Ok(append_document(doc, source, page_break_between))
    })
}

/// Merge several sources in order
pub fn merge_documents(
    doc: &mut Document,
    sources: &[Document],
    page_break_between: bool,
    options: EditOptions,
) -> Result<usize> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let mut appended = 0usize;
        for source in sources {
            appended += append_document(doc, source, page_break_between);
        }
        Ok(appended)
    })
}

fn append_document(doc: &mut Document, source: &Document, page_break: bool) -> usize {
    let mut count = 0usize;
    if page_break && doc.body_len() > 0 {
        doc.push_block(Block::PageBreak);
        count += 1;
    }

    let remap = IdRemap::build(doc, source);

    // Styles: fill in names the target lacks, never overwrite
    for (name, style) in &source.styles {
        doc.styles
            .entry(name.clone())
            .or_insert_with(|| style.clone());
    }

    for &block_id in source.body() {
        if let Some(block) = source.block(block_id) {
            let copied = copy_block(doc, source, block, &remap);
            doc.push_block(copied);
            count += 1;
        }
    }
    count
}

/// Id translations from a source document into the target's id spaces
struct IdRemap {
    notes: BTreeMap<(doc_model::NoteKind, u32), u32>,
    comments: BTreeMap<u32, u32>,
    media: BTreeMap<String, String>,
}

impl IdRemap {
    fn build(doc: &mut Document, source: &Document) -> Self {
        let mut notes = BTreeMap::new();
        for kind in [doc_model::NoteKind::Footnote, doc_model::NoteKind::Endnote] {
            for entry in source.notes.entries(kind) {
                let new_id = doc.notes.add_entry(kind, entry.content.clone());
                notes.insert((kind, entry.id), new_id);
            }
        }

        let mut comments = BTreeMap::new();
        for comment in source.comments.all() {
            let new_id = doc.comments.add(&comment.author, &comment.text);
            if let Some(copied) = doc.comments.get_mut(new_id) {
                copied.date = comment.date;
                copied.initials = comment.initials.clone();
            }
            comments.insert(comment.id, new_id);
        }

        let mut media = BTreeMap::new();
        for rel in source.media.iter() {
            let new_rel = doc.media.add(rel.content_type.clone(), rel.data.clone());
            media.insert(rel.rel_id.clone(), new_rel);
        }

        Self {
            notes,
            comments,
            media,
        }
    }

    fn run(&self, run: &Run) -> Run {
        match run {
            Run::NoteRef { kind, id } => Run::NoteRef {
                kind: *kind,
                id: self.notes.get(&(*kind, *id)).copied().unwrap_or(*id),
            },
            Run::CommentStart { id } => Run::CommentStart {
                id: self.comments.get(id).copied().unwrap_or(*id),
            },
            Run::CommentEnd { id } => Run::CommentEnd {
                id: self.comments.get(id).copied().unwrap_or(*id),
            },
            Run::Picture { rel_id } => Run::Picture {
                rel_id: self
                    .media
                    .get(rel_id)
                    .cloned()
                    .unwrap_or_else(|| rel_id.clone()),
            },
            other => other.clone(),
        }
    }
}

fn copy_block(doc: &mut Document, source: &Document, block: &Block, remap: &IdRemap) -> Block {
    match block {
        Block::Paragraph(para) => {
            let mut copied = para.clone();
            for run in &mut copied.runs {
                *run = remap.run(run);
            }
            Block::Paragraph(copied)
        }
        Block::Table(table) => {
            let mut copied = Table {
                rows: table.rows.clone(),
                style: table.style.clone(),
            };
            for row in &mut copied.rows {
                for cell in &mut row.cells {
                    let children = std::mem::take(&mut cell.blocks);
                    for child_id in children {
                        if let Some(child) = source.block(child_id) {
                            let copied_child = copy_block(doc, source, child, remap);
                            cell.blocks.push(doc.alloc_block(copied_child));
                        }
                    }
                }
            }
            Block::Table(copied)
        }
        other => other.clone(),
    }
}
