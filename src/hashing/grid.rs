//! Reference-point grid laid over a template box or a scene window.

use crate::geometry::{Point, Rect};

/// Cell of the reference grid, `col` across and `row` down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub col: u16,
    pub row: u16,
}

impl GridCell {
    pub const fn new(col: u16, row: u16) -> Self {
        Self { col, row }
    }

    /// Chebyshev distance in cells.
    pub fn distance(&self, other: &GridCell) -> u16 {
        self.col.abs_diff(other.col).max(self.row.abs_diff(other.row))
    }
}

/// Regular `cols x rows` grid of reference points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceGrid {
    pub cols: u16,
    pub rows: u16,
}

impl ReferenceGrid {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    pub fn len(&self) -> usize {
        usize::from(self.cols) * usize::from(self.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| GridCell::new(col, row)))
    }

    /// Pixel position of the cell center inside `rect`.
    ///
    /// Integer arithmetic only, so a template box and a scene window of the
    /// same size map every cell to the same relative pixel.
    pub fn position(&self, rect: Rect, cell: GridCell) -> Point {
        let cols = usize::from(self.cols);
        let rows = usize::from(self.rows);
        let x = rect.x + ((2 * usize::from(cell.col) + 1) * rect.width) / (2 * cols);
        let y = rect.y + ((2 * usize::from(cell.row) + 1) * rect.height) / (2 * rows);
        Point::new(x, y)
    }
}
