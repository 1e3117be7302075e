//! Shared geometry types.

use serde::{Deserialize, Serialize};

/// A rectangle representing window or monitor geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Center X coordinate
    pub fn center_x(&self) -> i32 {
        self.x + (self.width as i32) / 2
    }

    /// Center Y coordinate
    pub fn center_y(&self) -> i32 {
        self.y + (self.height as i32) / 2
    }

    /// Whether a point lies inside this rectangle
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }

    /// Axis-aligned rectangle overlap test. Two rectangles do not overlap
    /// iff one is entirely left of, right of, above, or below the other.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let self_right = self.x + self.width as i32;
        let self_bottom = self.y + self.height as i32;
        let other_right = other.x + other.width as i32;
        let other_bottom = other.y + other.height as i32;

        !(self_right <= other.x
            || self.x >= other_right
            || self_bottom <= other.y
            || self.y >= other_bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(0, 0, 100, 100);
        assert_eq!(rect.center_x(), 50);
        assert_eq!(rect.center_y(), 50);

        let rect = Rect::new(10, 20, 100, 200);
        assert_eq!(rect.center_x(), 60);
        assert_eq!(rect.center_y(), 120);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(100, 100, 50, 50);
        assert!(rect.contains(100, 100));
        assert!(rect.contains(149, 149));
        assert!(!rect.contains(150, 100));
        assert!(!rect.contains(99, 120));
    }

    #[test]
    fn test_rect_overlaps() {
        let a = Rect::new(0, 0, 100, 100);
        assert!(a.overlaps(&Rect::new(50, 50, 100, 100)));
        assert!(a.overlaps(&Rect::new(0, 0, 100, 100)));
        // Touching edges do not overlap
        assert!(!a.overlaps(&Rect::new(100, 0, 100, 100)));
        assert!(!a.overlaps(&Rect::new(0, 100, 100, 100)));
        assert!(!a.overlaps(&Rect::new(-100, 0, 100, 100)));
    }
}
