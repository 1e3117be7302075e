//! Client registry and workspace management.
//!
//! All managed windows live in one slot map keyed by a stable `ClientId`;
//! each of the 9 workspaces holds an ordered list of ids plus a weak
//! "last focused" key. Removing a client invalidates only its id, so a
//! stale last-focused key simply reads back as absent.

use slotmap::{new_key_type, SlotMap};
use x11rb::protocol::xproto::Window;

use crate::types::Rect;

/// Number of workspaces (virtual desktops)
pub const NUM_WORKSPACES: usize = 9;

new_key_type! {
    /// Stable identifier for a managed client
    pub struct ClientId;
}

/// One managed window
#[derive(Debug, Clone)]
pub struct Client {
    /// The X window handle
    pub window: Window,
    /// Current geometry in root coordinates
    pub rect: Rect,
    /// Geometry saved when entering fullscreen
    pub saved_rect: Rect,
    /// Whether the client currently covers its monitor
    pub fullscreen: bool,
    /// Index of the owning workspace
    pub workspace: usize,
}

impl Client {
    pub fn new(window: Window, workspace: usize) -> Self {
        Self {
            window,
            rect: Rect::new(0, 0, 0, 0),
            saved_rect: Rect::new(0, 0, 0, 0),
            fullscreen: false,
            workspace,
        }
    }

    /// Whether the client has been placed yet (freshly mapped windows
    /// have zero size until the layout pass assigns them a cell)
    pub fn has_geometry(&self) -> bool {
        self.rect.width > 0 && self.rect.height > 0
    }

    /// Save current geometry and mark fullscreen
    pub fn enter_fullscreen(&mut self) {
        self.saved_rect = self.rect;
        self.fullscreen = true;
    }

    /// Restore the geometry saved on entry and clear the flag
    pub fn leave_fullscreen(&mut self) {
        self.rect = self.saved_rect;
        self.fullscreen = false;
    }
}

/// One of the 9 workspace slots
#[derive(Debug, Default)]
pub struct Workspace {
    /// Clients owned by this workspace, in mapping order (newest last)
    pub clients: Vec<ClientId>,
    /// Weak back-reference to the client focused when we last left this
    /// workspace; validated against the registry on read
    pub last_focused: Option<ClientId>,
}

/// Owns every client and partitions them into workspaces. Exactly one
/// workspace is current; focus always points into the current workspace.
pub struct WorkspaceManager {
    clients: SlotMap<ClientId, Client>,
    workspaces: [Workspace; NUM_WORKSPACES],
    current: usize,
    focused: Option<ClientId>,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self {
            clients: SlotMap::with_key(),
            workspaces: std::array::from_fn(|_| Workspace::default()),
            current: 0,
            focused: None,
        }
    }

    /// Index of the current workspace (0-based)
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id)
    }

    /// Currently focused client id, if any
    pub fn focused(&self) -> Option<ClientId> {
        self.focused
    }

    pub fn focused_client(&self) -> Option<&Client> {
        self.focused.and_then(|id| self.clients.get(id))
    }

    /// Record a new focus target. The previously focused client becomes
    /// its workspace's last-focused memory.
    pub fn set_focused(&mut self, id: ClientId) -> bool {
        if !self.clients.contains_key(id) {
            return false;
        }
        if let Some(prev) = self.focused {
            if let Some(client) = self.clients.get(prev) {
                self.workspaces[client.workspace].last_focused = Some(prev);
            }
        }
        self.focused = Some(id);
        true
    }

    /// Create a client on the current workspace. The caller decides focus.
    pub fn insert(&mut self, window: Window) -> ClientId {
        let id = self.clients.insert(Client::new(window, self.current));
        self.workspaces[self.current].clients.push(id);
        id
    }

    /// Remove a client entirely. If it was focused, focus falls back to
    /// the current workspace's first client (or nothing).
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let client = self.clients.remove(id)?;
        let ws = &mut self.workspaces[client.workspace];
        ws.clients.retain(|&c| c != id);
        if ws.last_focused == Some(id) {
            ws.last_focused = None;
        }
        if self.focused == Some(id) {
            self.focused = self.first_on(self.current);
        }
        Some(client)
    }

    /// Look a client up by its X window handle
    pub fn find_window(&self, window: Window) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| c.window == window)
            .map(|(id, _)| id)
    }

    /// Ids of clients on a workspace, in collection order
    pub fn clients_on(&self, ws: usize) -> &[ClientId] {
        &self.workspaces[ws].clients
    }

    /// Iterate over every client on every workspace
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.clients.iter()
    }

    /// First client of a workspace, if any
    pub fn first_on(&self, ws: usize) -> Option<ClientId> {
        self.workspaces[ws].clients.first().copied()
    }

    /// Validated last-focused client of a workspace: `None` if the
    /// remembered client is gone
    pub fn last_focused_on(&self, ws: usize) -> Option<ClientId> {
        self.workspaces[ws]
            .last_focused
            .filter(|&id| self.clients.contains_key(id))
    }

    /// Make `target` the current workspace. Returns false (no-op) if it
    /// already is, or is out of range. The current focus is remembered as
    /// this workspace's last-focused; the new focus is the target's
    /// remembered client, else its first client, else nothing.
    pub fn switch_to(&mut self, target: usize) -> bool {
        if target >= NUM_WORKSPACES || target == self.current {
            return false;
        }
        self.workspaces[self.current].last_focused = self.focused;
        self.current = target;
        self.focused = self
            .last_focused_on(target)
            .or_else(|| self.first_on(target));
        true
    }

    /// Move the focused client to another workspace. Ownership transfers
    /// atomically; the fullscreen flag is cleared; focus is reassigned
    /// within the current workspace. Returns the moved client's id.
    pub fn move_focused_to(&mut self, target: usize) -> Option<ClientId> {
        let id = self.focused?;
        if target >= NUM_WORKSPACES || target == self.current {
            return None;
        }

        let ws = &mut self.workspaces[self.current];
        ws.clients.retain(|&c| c != id);
        if ws.last_focused == Some(id) {
            ws.last_focused = None;
        }

        let client = self.clients.get_mut(id)?;
        client.fullscreen = false;
        client.workspace = target;
        self.workspaces[target].clients.push(id);

        self.focused = self.first_on(self.current);
        Some(id)
    }

    /// Next focus target when cycling. Forward moves to the next client
    /// in the collection (wrapping to the first); backward to the
    /// previous (wrapping to the last). With nothing focused, forward
    /// starts at the first client and backward at the last.
    pub fn cycle_target(&self, forward: bool) -> Option<ClientId> {
        let order = &self.workspaces[self.current].clients;
        if order.is_empty() {
            return None;
        }

        let pos = self.focused.and_then(|id| order.iter().position(|&c| c == id));
        let idx = match (pos, forward) {
            (None, true) => 0,
            (None, false) => order.len() - 1,
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => {
                if i == 0 {
                    order.len() - 1
                } else {
                    i - 1
                }
            }
        };
        Some(order[idx])
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        let b = wm.insert(0x200);

        assert_eq!(wm.find_window(0x100), Some(a));
        assert_eq!(wm.find_window(0x200), Some(b));
        assert_eq!(wm.find_window(0x300), None);
        assert_eq!(wm.clients_on(0), &[a, b]);
        assert_eq!(wm.get(a).unwrap().workspace, 0);
    }

    #[test]
    fn test_remove_reassigns_focus() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        let b = wm.insert(0x200);
        wm.set_focused(b);

        wm.remove(b);
        assert_eq!(wm.focused(), Some(a));

        wm.remove(a);
        assert_eq!(wm.focused(), None);
        assert!(wm.clients_on(0).is_empty());
    }

    #[test]
    fn test_switch_to_same_workspace_is_noop() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        wm.set_focused(a);

        assert!(!wm.switch_to(0));
        assert_eq!(wm.current_index(), 0);
        assert_eq!(wm.focused(), Some(a));

        assert!(!wm.switch_to(NUM_WORKSPACES));
        assert_eq!(wm.current_index(), 0);
    }

    #[test]
    fn test_switch_restores_last_focused() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        let b = wm.insert(0x200);
        wm.set_focused(a);

        assert!(wm.switch_to(1));
        assert_eq!(wm.focused(), None);

        // Coming back lands on the remembered client, not the first one
        assert!(wm.switch_to(0));
        assert_eq!(wm.focused(), Some(a));
        let _ = b;
    }

    #[test]
    fn test_switch_falls_back_when_last_focused_gone() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        let b = wm.insert(0x200);
        wm.set_focused(b);

        wm.switch_to(1);
        wm.switch_to(0);
        assert_eq!(wm.focused(), Some(b));

        wm.switch_to(1);
        // The remembered client disappears while we are away
        wm.remove(b);
        wm.switch_to(0);
        assert_eq!(wm.focused(), Some(a));
    }

    #[test]
    fn test_move_sole_client() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        wm.set_focused(a);
        wm.get_mut(a).unwrap().fullscreen = true;

        let moved = wm.move_focused_to(1);
        assert_eq!(moved, Some(a));

        // Source workspace is empty with no focus; target owns the client
        // with its fullscreen flag cleared
        assert!(wm.clients_on(0).is_empty());
        assert_eq!(wm.focused(), None);
        assert_eq!(wm.clients_on(1), &[a]);
        let client = wm.get(a).unwrap();
        assert_eq!(client.workspace, 1);
        assert!(!client.fullscreen);
    }

    #[test]
    fn test_move_invalid_targets() {
        let mut wm = WorkspaceManager::new();
        assert_eq!(wm.move_focused_to(1), None); // nothing focused

        let a = wm.insert(0x100);
        wm.set_focused(a);
        assert_eq!(wm.move_focused_to(0), None); // same workspace
        assert_eq!(wm.move_focused_to(NUM_WORKSPACES), None); // out of range
        assert_eq!(wm.focused(), Some(a));
    }

    #[test]
    fn test_cycle_focus_wraps() {
        let mut wm = WorkspaceManager::new();
        let a = wm.insert(0x100);
        let b = wm.insert(0x200);
        let c = wm.insert(0x300);

        wm.set_focused(c);
        assert_eq!(wm.cycle_target(true), Some(a));

        wm.set_focused(a);
        assert_eq!(wm.cycle_target(false), Some(c));

        wm.set_focused(b);
        assert_eq!(wm.cycle_target(true), Some(c));
        assert_eq!(wm.cycle_target(false), Some(a));
    }

    #[test]
    fn test_cycle_focus_entry_points() {
        let mut wm = WorkspaceManager::new();
        assert_eq!(wm.cycle_target(true), None);

        let a = wm.insert(0x100);
        let b = wm.insert(0x200);
        // Nothing focused: forward starts at the first, backward at the last
        assert_eq!(wm.cycle_target(true), Some(a));
        assert_eq!(wm.cycle_target(false), Some(b));
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let mut client = Client::new(0x100, 0);
        client.rect = Rect::new(8, 8, 265, 260);

        client.enter_fullscreen();
        client.rect = Rect::new(0, 0, 1920, 1080);
        assert!(client.fullscreen);

        client.leave_fullscreen();
        assert!(!client.fullscreen);
        assert_eq!(client.rect, Rect::new(8, 8, 265, 260));
    }

    #[test]
    fn test_has_geometry() {
        let mut client = Client::new(0x100, 0);
        assert!(!client.has_geometry());
        client.rect = Rect::new(0, 0, 100, 100);
        assert!(client.has_geometry());
    }
}
