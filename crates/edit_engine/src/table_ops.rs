//! Table operations
//!
//! Table cells hold nested blocks by id; cell text operations allocate
//! or rewrite the paragraph inside the target cell.

use crate::{guarded_edit, Anchor, EditError, EditKind, EditOptions, Result};
use crate::content_ops::cascade_removed_markers;
use crate::InsertPosition;
use doc_model::table::Table;
use doc_model::{Block, BlockId, Document};
use serde::{Deserialize, Serialize};

/// Cell formatting fields settable per cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellPatch {
    /// Background shading as a hex color, e.g. "D9D9D9"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shading: Option<String>,
    /// Preferred width in twentieths of a point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// Append an empty table of the given dimensions
pub fn add_table(
    doc: &mut Document,
    rows: usize,
    cols: usize,
    style: Option<&str>,
    options: EditOptions,
) -> Result<BlockId> {
    if rows == 0 || cols == 0 {
        return Err(EditError::InvalidParameter(format!(
            "table dimensions {rows}x{cols} are degenerate"
        )));
    }
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let mut table = Table::new(rows, cols);
        table.style = style.map(str::to_string);
        Ok(doc.push_block(Block::Table(table)))
    })
}

/// Insert a table near an anchor
pub fn insert_table_near(
    doc: &mut Document,
    anchor: &Anchor,
    position: InsertPosition,
    rows: usize,
    cols: usize,
    options: EditOptions,
) -> Result<BlockId> {
    if rows == 0 || cols == 0 {
        return Err(EditError::InvalidParameter(format!(
            "table dimensions {rows}x{cols} are degenerate"
        )));
    }
    crate::insert_blocks_near(
        doc,
        anchor,
        position,
        vec![Block::Table(Table::new(rows, cols))],
        options,
    )
    .map(|ids| ids[0])
}

/// Set the text of a cell, replacing its previous content blocks
pub fn set_cell_text(
    doc: &mut Document,
    table_index: usize,
    row: usize,
    col: usize,
    text: &str,
    options: EditOptions,
) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let table_id = table_block_id(doc, table_index)?;
        let para_id = doc.alloc_block(Block::paragraph(text));

        let Some(Block::Table(table)) = doc.block_mut(table_id) else {
            return Err(EditError::InvalidParameter(
                "block is not a table".to_string(),
            ));
        };
        let cell = table
            .cell_mut(row, col)
            .ok_or(EditError::IndexOutOfRange {
                index: row.max(col),
                len: 0,
            })?;
        let old = std::mem::replace(&mut cell.blocks, vec![para_id]);

        let mut removed = Vec::new();
        for id in old {
            removed.extend(doc.remove_subtree(id));
        }
        cascade_removed_markers(doc, &removed);
        Ok(())
    })
}

/// Read a cell's visible text
pub fn cell_text(doc: &Document, table_index: usize, row: usize, col: usize) -> Result<String> {
    let table_id = table_block_id(doc, table_index)?;
    let Some(Block::Table(table)) = doc.block(table_id) else {
        return Err(EditError::InvalidParameter(
            "block is not a table".to_string(),
        ));
    };
    let cell = table.cell(row, col).ok_or(EditError::IndexOutOfRange {
        index: row.max(col),
        len: 0,
    })?;
    let parts: Vec<String> = cell
        .blocks
        .iter()
        .filter_map(|&id| doc.block(id))
        .map(|b| b.visible_text())
        .collect();
    Ok(parts.join("\n"))
}

/// Apply shading or width to a cell
pub fn format_cell(
    doc: &mut Document,
    table_index: usize,
    row: usize,
    col: usize,
    patch: &CellPatch,
    options: EditOptions,
) -> Result<()> {
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let table_id = table_block_id(doc, table_index)?;
        let Some(Block::Table(table)) = doc.block_mut(table_id) else {
            return Err(EditError::InvalidParameter(
                "block is not a table".to_string(),
            ));
        };
        let cell = table
            .cell_mut(row, col)
            .ok_or(EditError::IndexOutOfRange {
                index: row.max(col),
                len: 0,
            })?;
        if let Some(shading) = &patch.shading {
            cell.shading = Some(shading.clone());
        }
        if let Some(width) = patch.width {
            cell.width = Some(width);
        }
        Ok(())
    })
}

/// Merge a horizontal run of cells into one spanning cell
pub fn merge_cells(
    doc: &mut Document,
    table_index: usize,
    row: usize,
    start_col: usize,
    count: usize,
    options: EditOptions,
) -> Result<()> {
    if count < 2 {
        return Err(EditError::InvalidParameter(
            "merge needs at least two cells".to_string(),
        ));
    }
    guarded_edit(doc, EditKind::Structural, options, |doc| {
        let table_id = table_block_id(doc, table_index)?;
        let Some(Block::Table(table)) = doc.block_mut(table_id) else {
            return Err(EditError::InvalidParameter(
                "block is not a table".to_string(),
            ));
        };
        if !table.merge_cells_horizontal(row, start_col, count) {
            return Err(EditError::InvalidRange(format!(
                "cells [{start_col}, {}) do not exist in row {row}",
                start_col + count
            )));
        }
        Ok(())
    })
}

/// Body index of the nth table block
fn table_block_id(doc: &Document, table_index: usize) -> Result<BlockId> {
    let tables: Vec<BlockId> = doc
        .body()
        .iter()
        .copied()
        .filter(|&id| matches!(doc.block(id), Some(Block::Table(_))))
        .collect();
    tables
        .get(table_index)
        .copied()
        .ok_or(EditError::IndexOutOfRange {
            index: table_index,
            len: tables.len(),
        })
}
