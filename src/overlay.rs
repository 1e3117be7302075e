//! Overlay selection state machine.
//!
//! While the overlay is up, the user picks a rectangular grid span with two
//! keystrokes. The machine here only tracks the two-slot label buffer and
//! its transitions; showing, drawing, and hiding the overlay window are
//! side effects driven from the event handlers.

use crate::grid::Grid;

/// Result of feeding a key into the active overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Key does not label any cell; nothing changed
    Ignored,
    /// A buffer slot was filled; redraw and keep waiting
    Updated,
    /// Both slots are filled; the selection is ready to commit
    Complete,
}

/// Phase of the two-key selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingFirstKey,
    AwaitingSecondKey,
}

/// The overlay's selection buffer: zero, one, or two picked cell labels
#[derive(Debug, Default)]
pub struct OverlaySelection {
    active: bool,
    buffer: [Option<char>; 2],
}

impl OverlaySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> Phase {
        if !self.active {
            Phase::Idle
        } else if self.buffer[0].is_none() {
            Phase::AwaitingFirstKey
        } else {
            Phase::AwaitingSecondKey
        }
    }

    pub fn first(&self) -> Option<char> {
        self.buffer[0]
    }

    pub fn second(&self) -> Option<char> {
        self.buffer[1]
    }

    /// Enter overlay mode with an empty buffer
    pub fn begin(&mut self) {
        self.active = true;
        self.buffer = [None; 2];
    }

    /// Leave overlay mode, clearing the buffer
    pub fn cancel(&mut self) {
        self.active = false;
        self.buffer = [None; 2];
    }

    /// Clear the most recently filled slot. Stays in overlay mode even
    /// when the buffer is already empty.
    pub fn backspace(&mut self) {
        if self.buffer[1].is_some() {
            self.buffer[1] = None;
        } else if self.buffer[0].is_some() {
            self.buffer[0] = None;
        }
    }

    /// Feed a key into the selection. Characters fold to lowercase and are
    /// accepted only if they label a grid cell.
    pub fn accept_key(&mut self, ch: char, grid: &Grid) -> KeyOutcome {
        let ch = ch.to_ascii_lowercase();
        if !grid.has_label(ch) {
            return KeyOutcome::Ignored;
        }

        if self.buffer[0].is_none() {
            self.buffer[0] = Some(ch);
            KeyOutcome::Updated
        } else if self.buffer[1].is_none() {
            self.buffer[1] = Some(ch);
            KeyOutcome::Complete
        } else {
            KeyOutcome::Ignored
        }
    }

    /// Resolve the buffer to a pair of grid coordinates, if both slots are
    /// filled with labels the grid knows.
    pub fn resolve(&self, grid: &Grid) -> Option<((usize, usize), (usize, usize))> {
        let a = grid.position_of(self.buffer[0]?)?;
        let b = grid.position_of(self.buffer[1]?)?;
        Some((a, b))
    }

    /// Whether cell (row, col) should be drawn highlighted: the normalized
    /// span once both cells are picked, just the first cell before that.
    pub fn is_selected(&self, grid: &Grid, row: usize, col: usize) -> bool {
        let Some(first) = self.buffer[0].and_then(|ch| grid.position_of(ch)) else {
            return false;
        };
        match self.buffer[1].and_then(|ch| grid.position_of(ch)) {
            Some(second) => {
                let (r1, r2) = (first.0.min(second.0), first.0.max(second.0));
                let (c1, c2) = (first.1.min(second.1), first.1.max(second.1));
                row >= r1 && row <= r2 && col >= c1 && col <= c2
            }
            None => row == first.0 && col == first.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qwerty_grid() -> Grid {
        Grid::new(
            vec![
                vec!['q', 'w', 'e', 'r'],
                vec!['a', 's', 'd', 'f'],
                vec!['z', 'x', 'c', 'v'],
            ],
            10,
        )
    }

    #[test]
    fn test_phases() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        assert_eq!(sel.phase(), Phase::Idle);

        sel.begin();
        assert_eq!(sel.phase(), Phase::AwaitingFirstKey);

        assert_eq!(sel.accept_key('q', &grid), KeyOutcome::Updated);
        assert_eq!(sel.phase(), Phase::AwaitingSecondKey);

        assert_eq!(sel.accept_key('d', &grid), KeyOutcome::Complete);
        assert_eq!(sel.resolve(&grid), Some(((0, 0), (1, 2))));

        sel.cancel();
        assert_eq!(sel.phase(), Phase::Idle);
        assert_eq!(sel.first(), None);
    }

    #[test]
    fn test_unmapped_keys_ignored() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        sel.begin();

        assert_eq!(sel.accept_key('9', &grid), KeyOutcome::Ignored);
        assert_eq!(sel.accept_key('y', &grid), KeyOutcome::Ignored);
        assert_eq!(sel.phase(), Phase::AwaitingFirstKey);
    }

    #[test]
    fn test_uppercase_folds() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        sel.begin();

        assert_eq!(sel.accept_key('Q', &grid), KeyOutcome::Updated);
        assert_eq!(sel.first(), Some('q'));
    }

    #[test]
    fn test_backspace_clears_most_recent() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        sel.begin();
        sel.accept_key('q', &grid);
        sel.accept_key('s', &grid);

        sel.backspace();
        assert_eq!(sel.first(), Some('q'));
        assert_eq!(sel.second(), None);

        sel.backspace();
        assert_eq!(sel.first(), None);
        assert!(sel.is_active());

        // Empty buffer: backspace keeps the overlay up
        sel.backspace();
        assert!(sel.is_active());
        assert_eq!(sel.phase(), Phase::AwaitingFirstKey);
    }

    #[test]
    fn test_begin_clears_previous_buffer() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        sel.begin();
        sel.accept_key('q', &grid);
        sel.begin();
        assert_eq!(sel.first(), None);
        assert_eq!(sel.phase(), Phase::AwaitingFirstKey);
    }

    #[test]
    fn test_highlight_single_then_span() {
        let grid = qwerty_grid();
        let mut sel = OverlaySelection::new();
        sel.begin();

        sel.accept_key('s', &grid); // (1, 1)
        assert!(sel.is_selected(&grid, 1, 1));
        assert!(!sel.is_selected(&grid, 0, 0));

        sel.accept_key('e', &grid); // (0, 2): span is rows 0..=1, cols 1..=2
        assert!(sel.is_selected(&grid, 0, 1));
        assert!(sel.is_selected(&grid, 1, 2));
        assert!(!sel.is_selected(&grid, 2, 1));
        assert!(!sel.is_selected(&grid, 0, 0));
    }

    #[test]
    fn test_resolve_order_matches_input() {
        let grid = qwerty_grid();
        let mut a = OverlaySelection::new();
        a.begin();
        a.accept_key('v', &grid);
        a.accept_key('q', &grid);

        let mut b = OverlaySelection::new();
        b.begin();
        b.accept_key('q', &grid);
        b.accept_key('v', &grid);

        // Resolution preserves input order; normalization happens in the
        // span computation, which is what makes the pair commutative.
        assert_eq!(a.resolve(&grid), Some(((2, 3), (0, 0))));
        assert_eq!(b.resolve(&grid), Some(((0, 0), (2, 3))));

        let monitor = crate::types::Rect::new(0, 0, 1920, 1080);
        let (pa, pb) = a.resolve(&grid).unwrap();
        let (qa, qb) = b.resolve(&grid).unwrap();
        assert_eq!(grid.span_rect(&monitor, pa, pb), grid.span_rect(&monitor, qa, qb));
    }
}
