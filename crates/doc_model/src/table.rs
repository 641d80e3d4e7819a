//! Table model
//!
//! Tables are 2-D grids of cells; each cell owns its own block sequence so
//! tables may nest. Horizontal merges are modeled with span metadata, and
//! the grid must stay rectangular counting spans (invariant checked by the
//! integrity validator).

use crate::BlockId;
use serde::{Deserialize, Serialize};

fn default_span() -> u32 {
    1
}

/// A single table cell owning a sequence of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Blocks contained in the cell, by arena id
    pub blocks: Vec<BlockId>,
    /// Background shading as a hex color without '#', e.g. "DDDDDD"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shading: Option<String>,
    /// Preferred width in twentieths of a point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Number of grid columns this cell spans (>= 1)
    #[serde(default = "default_span")]
    pub h_span: u32,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            shading: None,
            width: None,
            h_span: 1,
        }
    }
}

impl TableCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid columns consumed by this cell
    pub fn grid_span(&self) -> u32 {
        self.h_span.max(1)
    }
}

/// A table row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn with_cells(count: usize) -> Self {
        Self {
            cells: (0..count).map(|_| TableCell::new()).collect(),
        }
    }

    /// Grid columns consumed by this row, counting spans
    pub fn grid_width(&self) -> u32 {
        self.cells.iter().map(|c| c.grid_span()).sum()
    }
}

/// A table block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
    /// Named table style, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Table {
    /// Create an empty grid of the given dimensions
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| TableRow::with_cells(cols)).collect(),
            style: None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Grid column count, derived from the first row
    pub fn column_count(&self) -> u32 {
        self.rows.first().map(|r| r.grid_width()).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    /// Check that every row spans the same number of grid columns
    pub fn is_rectangular(&self) -> bool {
        let width = self.column_count();
        self.rows.iter().all(|r| r.grid_width() == width)
    }

    /// Merge a horizontal run of cells in a row into the first cell of the
    /// run. The absorbed cells' blocks move into the surviving cell and the
    /// grid stays rectangular because the span grows by the removed count.
    pub fn merge_cells_horizontal(&mut self, row: usize, start_col: usize, count: usize) -> bool {
        if count < 2 {
            return false;
        }
        let Some(r) = self.rows.get_mut(row) else {
            return false;
        };
        if start_col + count > r.cells.len() {
            return false;
        }
        let absorbed: Vec<TableCell> = r.cells.drain(start_col + 1..start_col + count).collect();
        let target = &mut r.cells[start_col];
        for cell in absorbed {
            target.h_span += cell.grid_span();
            target.blocks.extend(cell.blocks);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_rectangular() {
        let table = Table::new(3, 4);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 4);
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_merge_keeps_grid_rectangular() {
        let mut table = Table::new(2, 4);
        assert!(table.merge_cells_horizontal(0, 1, 2));
        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[1].grid_span(), 2);
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_merge_out_of_bounds_rejected() {
        let mut table = Table::new(2, 3);
        assert!(!table.merge_cells_horizontal(0, 2, 2));
        assert!(!table.merge_cells_horizontal(5, 0, 2));
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_ragged_detection() {
        let mut table = Table::new(2, 3);
        table.rows[1].cells.pop();
        assert!(!table.is_rectangular());
    }
}
