//! Grid layout geometry.
//!
//! The screen is divided into a fixed grid of rows x columns with integer
//! padding between cells and at the edges. All of the placement math lives
//! here, independent of the X connection, so it can be tested directly.

use crate::types::Rect;

/// The fixed layout grid for a monitor: dimensions, padding, and the
/// character labels shown in the overlay (row-major).
#[derive(Debug, Clone)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub padding: u32,
    labels: Vec<Vec<char>>,
}

impl Grid {
    /// Build a grid from its label rows. Every row must have the same
    /// length; rows x columns comes from the label shape.
    pub fn new(labels: Vec<Vec<char>>, padding: u32) -> Self {
        let rows = labels.len();
        let cols = labels.first().map(|r| r.len()).unwrap_or(0);
        debug_assert!(labels.iter().all(|r| r.len() == cols));
        Self { rows, cols, padding, labels }
    }

    /// Cell size for a monitor, truncating integer division:
    /// `cell_w = (width - P*(cols+1)) / cols` and likewise for rows.
    pub fn cell_size(&self, monitor: &Rect) -> (u32, u32) {
        let p = self.padding as i32;
        let cell_w = (monitor.width as i32 - p * (self.cols as i32 + 1)) / self.cols as i32;
        let cell_h = (monitor.height as i32 - p * (self.rows as i32 + 1)) / self.rows as i32;
        (cell_w.max(1) as u32, cell_h.max(1) as u32)
    }

    /// Geometry of cell (row, col) in root coordinates
    pub fn cell_rect(&self, monitor: &Rect, row: usize, col: usize) -> Rect {
        let (cell_w, cell_h) = self.cell_size(monitor);
        let p = self.padding as i32;
        Rect::new(
            monitor.x + p + col as i32 * (cell_w as i32 + p),
            monitor.y + p + row as i32 * (cell_h as i32 + p),
            cell_w,
            cell_h,
        )
    }

    /// Find the first free cell in row-major order: a cell is free if its
    /// rectangle overlaps none of `occupied` (fullscreen clients are
    /// expected to be filtered out by the caller).
    ///
    /// When every cell overlaps something, a narrow fallback applies: if
    /// some rectangle exactly occupies the single top-left cell, return the
    /// first cell that no rectangle exactly occupies as a single cell.
    /// Any other exhausted configuration falls back to (0, 0), even though
    /// that can stack the new window on an existing one.
    pub fn find_free_cell(&self, monitor: &Rect, occupied: &[Rect]) -> (usize, usize) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = self.cell_rect(monitor, row, col);
                if !occupied.iter().any(|r| r.overlaps(&cell)) {
                    return (row, col);
                }
            }
        }

        // Second pass: only when a window sits exactly on the top-left cell
        let top_left = self.cell_rect(monitor, 0, 0);
        if occupied.iter().any(|r| *r == top_left) {
            for row in 0..self.rows {
                for col in 0..self.cols {
                    let cell = self.cell_rect(monitor, row, col);
                    if !occupied.iter().any(|r| *r == cell) {
                        return (row, col);
                    }
                }
            }
        }

        (0, 0)
    }

    /// Rectangle spanning two selected cells (inclusive). The corners are
    /// normalized first, so the selection is commutative; the same cell
    /// twice yields exactly one cell's bounds.
    pub fn span_rect(&self, monitor: &Rect, a: (usize, usize), b: (usize, usize)) -> Rect {
        let (r1, r2) = (a.0.min(b.0), a.0.max(b.0));
        let (c1, c2) = (a.1.min(b.1), a.1.max(b.1));
        let rows = (r2 - r1 + 1) as u32;
        let cols = (c2 - c1 + 1) as u32;

        let (cell_w, cell_h) = self.cell_size(monitor);
        let origin = self.cell_rect(monitor, r1, c1);
        Rect::new(
            origin.x,
            origin.y,
            cols * cell_w + (cols - 1) * self.padding,
            rows * cell_h + (rows - 1) * self.padding,
        )
    }

    /// Label character of cell (row, col)
    pub fn label_at(&self, row: usize, col: usize) -> char {
        self.labels[row][col]
    }

    /// Grid coordinate of a label character, if it is one of ours
    pub fn position_of(&self, ch: char) -> Option<(usize, usize)> {
        for (row, row_labels) in self.labels.iter().enumerate() {
            for (col, &label) in row_labels.iter().enumerate() {
                if label == ch {
                    return Some((row, col));
                }
            }
        }
        None
    }

    /// Whether a character labels some cell
    pub fn has_label(&self, ch: char) -> bool {
        self.position_of(ch).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_grid(rows: usize, cols: usize, padding: u32) -> Grid {
        let labels = (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| char::from(b'a' + (r * cols + c) as u8))
                    .collect()
            })
            .collect();
        Grid::new(labels, padding)
    }

    #[test]
    fn test_cell_size_worked_example() {
        // 1920x1080 monitor, 4 rows x 7 cols, padding 8
        let grid = test_grid(4, 7, 8);
        let monitor = Rect::new(0, 0, 1920, 1080);
        let (w, h) = grid.cell_size(&monitor);
        assert_eq!(w, 265); // (1920 - 8*8) / 7
        assert_eq!(h, 260); // (1080 - 8*5) / 4
    }

    #[test]
    fn test_cell_rect_positions() {
        let grid = test_grid(4, 7, 8);
        let monitor = Rect::new(0, 0, 1920, 1080);
        assert_eq!(grid.cell_rect(&monitor, 0, 0), Rect::new(8, 8, 265, 260));
        // 281 = 8 + 1 * (265 + 8)
        assert_eq!(grid.cell_rect(&monitor, 0, 1), Rect::new(281, 8, 265, 260));
        assert_eq!(grid.cell_rect(&monitor, 1, 0), Rect::new(8, 276, 265, 260));
    }

    #[test]
    fn test_cell_rect_monitor_origin() {
        let grid = test_grid(3, 4, 10);
        let monitor = Rect::new(1920, 0, 1920, 1080);
        let cell = grid.cell_rect(&monitor, 0, 0);
        assert_eq!(cell.x, 1930);
        assert_eq!(cell.y, 10);
    }

    #[test]
    fn test_find_free_cell_empty() {
        let grid = test_grid(4, 7, 8);
        let monitor = Rect::new(0, 0, 1920, 1080);
        assert_eq!(grid.find_free_cell(&monitor, &[]), (0, 0));
    }

    #[test]
    fn test_find_free_cell_row_major_order() {
        let grid = test_grid(4, 7, 8);
        let monitor = Rect::new(0, 0, 1920, 1080);

        // First cell taken: next is (0, 1), not (1, 0)
        let occupied = vec![grid.cell_rect(&monitor, 0, 0)];
        assert_eq!(grid.find_free_cell(&monitor, &occupied), (0, 1));

        // Entire first row taken: first free is (1, 0)
        let occupied: Vec<Rect> = (0..7).map(|c| grid.cell_rect(&monitor, 0, c)).collect();
        assert_eq!(grid.find_free_cell(&monitor, &occupied), (1, 0));
    }

    #[test]
    fn test_find_free_cell_ignores_partial_overlap_as_free() {
        let grid = test_grid(4, 7, 8);
        let monitor = Rect::new(0, 0, 1920, 1080);
        // A window spanning cells (0,0) and (0,1) blocks both
        let occupied = vec![grid.span_rect(&monitor, (0, 0), (0, 1))];
        assert_eq!(grid.find_free_cell(&monitor, &occupied), (0, 2));
    }

    #[test]
    fn test_find_free_cell_fallback_single_cell_at_top_left() {
        let grid = test_grid(2, 2, 8);
        let monitor = Rect::new(0, 0, 800, 600);

        // One window exactly on (0,0), another spanning the whole grid so
        // that no cell is free in the first pass. Second pass skips cells
        // exactly occupied by single-cell windows.
        let top_left = grid.cell_rect(&monitor, 0, 0);
        let everything = grid.span_rect(&monitor, (0, 0), (1, 1));
        let occupied = vec![top_left, everything];
        assert_eq!(grid.find_free_cell(&monitor, &occupied), (0, 1));
    }

    #[test]
    fn test_find_free_cell_fallback_defaults_to_origin() {
        let grid = test_grid(2, 2, 8);
        let monitor = Rect::new(0, 0, 800, 600);

        // Grid exhausted by one big window, and nothing sits exactly on
        // the top-left cell: the narrow fallback does not apply.
        let occupied = vec![grid.span_rect(&monitor, (0, 0), (1, 1))];
        assert_eq!(grid.find_free_cell(&monitor, &occupied), (0, 0));
    }

    #[test]
    fn test_span_rect_commutative() {
        let grid = test_grid(3, 4, 10);
        let monitor = Rect::new(0, 0, 1920, 1080);
        let forward = grid.span_rect(&monitor, (0, 1), (2, 3));
        let backward = grid.span_rect(&monitor, (2, 3), (0, 1));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_span_rect_single_cell() {
        let grid = test_grid(3, 4, 10);
        let monitor = Rect::new(0, 0, 1920, 1080);
        let (cell_w, cell_h) = grid.cell_size(&monitor);
        let span = grid.span_rect(&monitor, (1, 2), (1, 2));
        assert_eq!(span, grid.cell_rect(&monitor, 1, 2));
        assert_eq!(span.width, cell_w);
        assert_eq!(span.height, cell_h);
    }

    #[test]
    fn test_span_rect_includes_internal_padding() {
        let grid = test_grid(3, 4, 10);
        let monitor = Rect::new(0, 0, 1920, 1080);
        let (cell_w, cell_h) = grid.cell_size(&monitor);
        let span = grid.span_rect(&monitor, (0, 0), (1, 1));
        assert_eq!(span.width, 2 * cell_w + 10);
        assert_eq!(span.height, 2 * cell_h + 10);
    }

    #[test]
    fn test_label_lookup() {
        let grid = Grid::new(
            vec![
                vec!['q', 'w', 'e', 'r'],
                vec!['a', 's', 'd', 'f'],
                vec!['z', 'x', 'c', 'v'],
            ],
            10,
        );
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.cols, 4);
        assert_eq!(grid.position_of('q'), Some((0, 0)));
        assert_eq!(grid.position_of('d'), Some((1, 2)));
        assert_eq!(grid.position_of('v'), Some((2, 3)));
        assert_eq!(grid.position_of('9'), None);
        assert!(grid.has_label('x'));
        assert!(!grid.has_label('y'));
        assert_eq!(grid.label_at(2, 1), 'x');
    }
}
