//! Multi-monitor support using RandR.
//!
//! Monitors are kept as an ordered vec so next/previous navigation is
//! plain modular arithmetic. The registry is rebuilt wholesale whenever
//! the topology changes and is never left empty: with no usable outputs
//! a single synthetic monitor covers the whole virtual screen.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use crate::types::Rect;

/// A physical display region
#[derive(Debug, Clone)]
pub struct Monitor {
    /// Ordinal in discovery order
    pub index: usize,
    /// Position and size on the root window
    pub rect: Rect,
}

/// Ordered registry of monitors; one is current
#[derive(Debug)]
pub struct MonitorManager {
    monitors: Vec<Monitor>,
    current: usize,
}

impl MonitorManager {
    /// Build a registry with a single monitor covering the given area
    pub fn single(rect: Rect) -> Self {
        Self {
            monitors: vec![Monitor { index: 0, rect }],
            current: 0,
        }
    }

    /// Build a registry from explicit regions (used by tests)
    pub fn with_regions(regions: &[Rect]) -> Self {
        let monitors = regions
            .iter()
            .enumerate()
            .map(|(index, &rect)| Monitor { index, rect })
            .collect();
        Self { monitors, current: 0 }
    }

    /// Rebuild the registry from RandR's active monitors, filtering out
    /// zero-area regions. Falls back to one synthetic monitor spanning the
    /// virtual screen. The current monitor resets to the first entry.
    pub fn refresh(
        &mut self,
        conn: &RustConnection,
        root: Window,
        screen_width: u32,
        screen_height: u32,
    ) -> Result<()> {
        self.monitors.clear();
        self.current = 0;

        let reply = conn
            .randr_get_monitors(root, true)?
            .reply()
            .context("Failed to query monitors from RandR")?;

        for info in reply.monitors {
            if info.width == 0 || info.height == 0 {
                continue;
            }
            let index = self.monitors.len();
            let rect = Rect::new(
                info.x as i32,
                info.y as i32,
                info.width as u32,
                info.height as u32,
            );
            log::info!(
                "Monitor {}: {}x{}+{}+{}",
                index,
                rect.width,
                rect.height,
                rect.x,
                rect.y
            );
            self.monitors.push(Monitor { index, rect });
        }

        if self.monitors.is_empty() {
            log::warn!("No usable monitors reported, falling back to the full screen");
            self.monitors.push(Monitor {
                index: 0,
                rect: Rect::new(0, 0, screen_width, screen_height),
            });
        }

        Ok(())
    }

    pub fn count(&self) -> usize {
        self.monitors.len()
    }

    pub fn get(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    /// The current monitor. The registry is never empty.
    pub fn current(&self) -> &Monitor {
        &self.monitors[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.monitors.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Monitor containing a window's center. Centers falling into a gap
    /// between outputs default to the first monitor.
    pub fn containing(&self, rect: &Rect) -> &Monitor {
        let (cx, cy) = (rect.center_x(), rect.center_y());
        self.monitors
            .iter()
            .find(|m| m.rect.contains(cx, cy))
            .unwrap_or(&self.monitors[0])
    }

    /// Index of the monitor `offset` steps around the ring from the
    /// current one; +1 is the successor, -1 the predecessor, both wrapping.
    pub fn adjacent_index(&self, offset: i32) -> usize {
        let len = self.monitors.len() as i32;
        (self.current as i32 + offset).rem_euclid(len) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_monitors() -> MonitorManager {
        MonitorManager::with_regions(&[
            Rect::new(0, 0, 1920, 1080),
            Rect::new(1920, 0, 1920, 1080),
            Rect::new(3840, 0, 1280, 1024),
        ])
    }

    #[test]
    fn test_single_registry() {
        let mm = MonitorManager::single(Rect::new(0, 0, 1920, 1080));
        assert_eq!(mm.count(), 1);
        assert_eq!(mm.current().index, 0);
        assert_eq!(mm.current().rect.width, 1920);
    }

    #[test]
    fn test_adjacent_wraps_forward() {
        let mut mm = three_monitors();
        mm.set_current(2);
        assert_eq!(mm.adjacent_index(1), 0);
        mm.set_current(0);
        assert_eq!(mm.adjacent_index(1), 1);
    }

    #[test]
    fn test_adjacent_wraps_backward() {
        let mut mm = three_monitors();
        mm.set_current(0);
        assert_eq!(mm.adjacent_index(-1), 2);
        mm.set_current(1);
        assert_eq!(mm.adjacent_index(-1), 0);
    }

    #[test]
    fn test_adjacent_single_monitor() {
        let mm = MonitorManager::single(Rect::new(0, 0, 800, 600));
        assert_eq!(mm.adjacent_index(1), 0);
        assert_eq!(mm.adjacent_index(-1), 0);
    }

    #[test]
    fn test_containing_by_center() {
        let mm = three_monitors();
        let on_second = Rect::new(2000, 100, 400, 300);
        assert_eq!(mm.containing(&on_second).index, 1);

        // Window straddling the seam belongs to whichever side its
        // center lands on
        let straddling = Rect::new(1800, 0, 400, 300);
        assert_eq!(mm.containing(&straddling).index, 1);
    }

    #[test]
    fn test_containing_gap_defaults_to_first() {
        let mm = MonitorManager::with_regions(&[
            Rect::new(0, 0, 1920, 1080),
            Rect::new(3000, 0, 1920, 1080),
        ]);
        let in_gap = Rect::new(2000, 0, 400, 300);
        assert_eq!(mm.containing(&in_gap).index, 0);
    }

    #[test]
    fn test_set_current_bounds() {
        let mut mm = three_monitors();
        assert!(mm.set_current(2));
        assert_eq!(mm.current_index(), 2);
        assert!(!mm.set_current(3));
        assert_eq!(mm.current_index(), 2);
    }
}
