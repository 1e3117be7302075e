//! gridwm - a grid-based tiling window manager for X11.
//!
//! Every window occupies a rectangle of cells in a fixed grid. New windows
//! land in the first free cell; a two-keystroke overlay resizes the focused
//! window to any rectangular span of cells.

mod config;
mod event;
mod ewmh;
mod grid;
mod monitor;
mod overlay;
mod spawn;
mod types;
mod workspaces;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use x11rb::connection::Connection;
use x11rb::cookie::VoidCookie;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeGCAux, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
    ConnectionExt, CreateGCAux, CreateWindowAux, EventMask, Gcontext, GrabMode, InputFocus,
    MapState, ModMask, PropMode, Rectangle, StackMode, Window, WindowClass,
};
use x11rb::protocol::ErrorKind;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::config::{Action, Config, ParsedBinding, Style};
use crate::event::KeyboardMap;
use crate::ewmh::Atoms;
use crate::grid::Grid;
use crate::monitor::MonitorManager;
use crate::overlay::OverlaySelection;
use crate::types::Rect;
use crate::workspaces::{ClientId, WorkspaceManager};

/// ICCCM WM_STATE value for a mapped, visible window
const NORMAL_STATE: u32 = 1;

/// How long the final overlay selection stays on screen before the
/// window is resized under it
const COMMIT_FLASH: Duration = Duration::from_millis(150);

/// Left-pointer glyph in the standard cursor font
const XC_LEFT_PTR: u16 = 68;

#[derive(Parser)]
#[command(
    name = "gridwm",
    about = "A grid-based tiling window manager",
    disable_version_flag = true
)]
struct Cli {
    /// Print version information and exit
    #[arg(short = 'v', long = "version")]
    version: bool,
}

/// The window manager: the X connection plus all runtime state
pub struct Wm {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    /// Virtual screen size, used to clamp pointer warps
    screen_width: u32,
    screen_height: u32,

    atoms: Atoms,
    style: Style,
    grid: Grid,
    keybindings: HashMap<ParsedBinding, Action>,
    keymap: KeyboardMap,

    clients: WorkspaceManager,
    monitors: MonitorManager,

    overlay: OverlaySelection,
    overlay_window: Option<(Window, Gcontext)>,

    /// Windows we unmapped ourselves; their UnmapNotify must not
    /// unmanage them
    hidden_windows: HashSet<Window>,

    running: bool,
}

impl Wm {
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None)
            .context("Failed to connect to X11 server (is DISPLAY set?)")?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_width = screen.width_in_pixels as u32;
        let screen_height = screen.height_in_pixels as u32;

        let atoms = Atoms::new(&conn)?;
        let keymap = KeyboardMap::new(&conn)?;

        let config = Config::load();
        let style = Style::from_config(&config);
        let grid = config.grid();
        let keybindings = config.parse_keybindings();

        let monitors = MonitorManager::single(Rect::new(0, 0, screen_width, screen_height));

        Ok(Self {
            conn,
            screen_num,
            root,
            screen_width,
            screen_height,
            atoms,
            style,
            grid,
            keybindings,
            keymap,
            clients: WorkspaceManager::new(),
            monitors,
            overlay: OverlaySelection::new(),
            overlay_window: None,
            hidden_windows: HashSet::new(),
            running: true,
        })
    }

    /// Claim window manager rights on the root window. Fails if another
    /// window manager already holds the substructure redirect.
    pub fn become_wm(&self) -> Result<()> {
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::ENTER_WINDOW;
        let attrs = ChangeWindowAttributesAux::new().event_mask(mask);
        let result = self
            .conn
            .change_window_attributes(self.root, &attrs)?
            .check();
        if result.is_err() {
            bail!("Another window manager is already running");
        }
        Ok(())
    }

    /// One-time setup: root cursor and background, monitor discovery,
    /// key grabs, and adoption of pre-existing windows.
    pub fn setup(&mut self) -> Result<()> {
        self.set_root_cursor()?;

        let attrs = ChangeWindowAttributesAux::new().background_pixel(self.style.root_background);
        self.conn.change_window_attributes(self.root, &attrs)?;
        self.conn.clear_area(false, self.root, 0, 0, 0, 0)?;

        self.conn
            .randr_select_input(self.root, randr::NotifyMask::SCREEN_CHANGE)
            .context("Failed to subscribe to RandR screen changes")?;
        self.refresh_monitors()?;

        self.grab_keys()?;
        self.scan_existing_windows()?;
        self.conn.flush()?;
        Ok(())
    }

    fn set_root_cursor(&self) -> Result<()> {
        let font = self.conn.generate_id()?;
        self.conn.open_font(font, b"cursor")?;
        let cursor = self.conn.generate_id()?;
        self.conn.create_glyph_cursor(
            cursor,
            font,
            font,
            XC_LEFT_PTR,
            XC_LEFT_PTR + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        let attrs = ChangeWindowAttributesAux::new().cursor(cursor);
        self.conn.change_window_attributes(self.root, &attrs)?;
        self.conn.close_font(font)?;
        Ok(())
    }

    /// Re-query RandR and point the current monitor at whichever contains
    /// the focused client (the first monitor otherwise).
    pub fn refresh_monitors(&mut self) -> Result<()> {
        self.monitors
            .refresh(&self.conn, self.root, self.screen_width, self.screen_height)?;
        if let Some(client) = self.clients.focused_client() {
            let index = self.monitors.containing(&client.rect).index;
            self.monitors.set_current(index);
        }
        Ok(())
    }

    /// Grab every bound key combination on the root window. Each binding
    /// is grabbed with all lock-modifier variants so Caps Lock and Num
    /// Lock do not swallow it.
    fn grab_keys(&self) -> Result<()> {
        let lock_variants = [
            ModMask::default(),
            ModMask::LOCK,
            ModMask::M2,
            ModMask::LOCK | ModMask::M2,
        ];

        for binding in self.keybindings.keys() {
            let Some(keycode) = self.keymap.keycode(binding.keysym) else {
                log::warn!("No keycode for keysym {:#x}, skipping grab", binding.keysym);
                continue;
            };
            for &locks in &lock_variants {
                self.conn.grab_key(
                    false,
                    self.root,
                    ModMask::from(binding.modifiers) | locks,
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
        }
        Ok(())
    }

    /// Adopt windows that were already mapped before we started
    fn scan_existing_windows(&mut self) -> Result<()> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        for window in tree.children {
            let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() else {
                continue;
            };
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            log::info!("Adopting existing window {:#x}", window);
            self.manage_window(window)?;
        }
        Ok(())
    }

    /// Start managing a window: register it, decorate it, map it, and
    /// give it focus. Placement happens in the following layout pass.
    pub fn manage_window(&mut self, window: Window) -> Result<()> {
        if self.clients.find_window(window).is_some() {
            return Ok(());
        }
        if let Ok(attrs) = self.conn.get_window_attributes(window)?.reply() {
            if attrs.override_redirect {
                return Ok(());
            }
        }

        let id = self.clients.insert(window);
        log::info!(
            "Managing window {:#x} on workspace {}",
            window,
            self.clients.current_index() + 1
        );

        let configure = ConfigureWindowAux::new().border_width(self.style.border_width);
        self.conn.configure_window(window, &configure)?;

        let events = EventMask::ENTER_WINDOW
            | EventMask::FOCUS_CHANGE
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE;
        let attrs = ChangeWindowAttributesAux::new().event_mask(events);
        self.conn.change_window_attributes(window, &attrs)?;

        // ICCCM: the window is now in the Normal state
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[NORMAL_STATE, NONE],
        )?;

        self.conn.map_window(window)?;
        self.arrange()?;
        self.focus_client(id, true);
        self.conn.flush()?;
        Ok(())
    }

    /// Stop managing a window after it was unmapped or destroyed
    pub fn unmanage_window(&mut self, window: Window) -> Result<()> {
        let Some(id) = self.clients.find_window(window) else {
            return Ok(());
        };
        let was_current = self
            .clients
            .get(id)
            .map(|c| c.workspace == self.clients.current_index())
            .unwrap_or(false);
        self.clients.remove(id);
        self.hidden_windows.remove(&window);
        log::info!("Unmanaged window {:#x}", window);

        if was_current {
            if let Some(focus) = self.clients.focused() {
                self.focus_client(focus, true);
            }
            self.arrange()?;
        }
        self.conn.flush()?;
        Ok(())
    }

    /// Place every unplaced client on the current workspace and refresh
    /// borders. Skipped entirely while the focused client is fullscreen
    /// so the covering window is not disturbed.
    pub fn arrange(&mut self) -> Result<()> {
        if self
            .clients
            .focused_client()
            .map(|c| c.fullscreen)
            .unwrap_or(false)
        {
            return Ok(());
        }

        let ws = self.clients.current_index();
        let ids: Vec<ClientId> = self.clients.clients_on(ws).to_vec();
        for id in &ids {
            let unplaced = self
                .clients
                .get(*id)
                .map(|c| !c.has_geometry())
                .unwrap_or(false);
            if unplaced {
                self.place_in_free_cell(*id, self.monitors.current_index());
            }
        }

        for id in ids {
            let Some(client) = self.clients.get(id) else { continue };
            let color = if self.clients.focused() == Some(id) {
                self.style.border_focused
            } else {
                self.style.border_normal
            };
            let attrs = ChangeWindowAttributesAux::new().border_pixel(color);
            ignore_gone(
                self.conn.change_window_attributes(client.window, &attrs),
                "border update",
            );
        }
        Ok(())
    }

    /// Rectangles blocking placement on a monitor: placed, non-fullscreen
    /// clients of the current workspace whose center lies on it.
    fn occupied_rects(&self, monitor_index: usize, exclude: Option<ClientId>) -> Vec<Rect> {
        let ws = self.clients.current_index();
        self.clients
            .clients_on(ws)
            .iter()
            .filter(|&&id| Some(id) != exclude)
            .filter_map(|&id| self.clients.get(id))
            .filter(|c| c.has_geometry() && !c.fullscreen)
            .filter(|c| self.monitors.containing(&c.rect).index == monitor_index)
            .map(|c| c.rect)
            .collect()
    }

    /// Move a client into the first free cell of the given monitor
    fn place_in_free_cell(&mut self, id: ClientId, monitor_index: usize) {
        let Some(monitor) = self.monitors.get(monitor_index) else {
            return;
        };
        let monitor_rect = monitor.rect;
        let occupied = self.occupied_rects(monitor_index, Some(id));
        let (row, col) = self.grid.find_free_cell(&monitor_rect, &occupied);
        let rect = self.grid.cell_rect(&monitor_rect, row, col);
        self.resize_client(id, rect);
    }

    /// Apply a new outer rectangle to a client. The configured size is
    /// shrunk by the border on each side so the decorated window fits the
    /// rectangle exactly.
    fn resize_client(&mut self, id: ClientId, rect: Rect) {
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };
        client.rect = rect;
        let window = client.window;
        let bw = self.style.border_width;
        let configure = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(rect.width.saturating_sub(2 * bw).max(1))
            .height(rect.height.saturating_sub(2 * bw).max(1));
        ignore_gone(self.conn.configure_window(window, &configure), "resize");
    }

    /// Give a client the input focus: border colors, stacking, the X
    /// focus itself, WM_TAKE_FOCUS, and optionally a pointer warp to its
    /// bottom-right corner.
    pub fn focus_client(&mut self, id: ClientId, warp: bool) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let window = client.window;
        let rect = client.rect;
        let fullscreen = client.fullscreen;

        if let Some(prev) = self.clients.focused() {
            if prev != id {
                if let Some(prev_client) = self.clients.get(prev) {
                    let attrs =
                        ChangeWindowAttributesAux::new().border_pixel(self.style.border_normal);
                    ignore_gone(
                        self.conn
                            .change_window_attributes(prev_client.window, &attrs),
                        "unfocus border",
                    );
                }
            }
        }
        self.clients.set_focused(id);

        let attrs = ChangeWindowAttributesAux::new().border_pixel(self.style.border_focused);
        ignore_gone(
            self.conn.change_window_attributes(window, &attrs),
            "focus border",
        );
        let raise = ConfigureWindowAux::new().stack_mode(StackMode::ABOVE);
        ignore_gone(self.conn.configure_window(window, &raise), "raise");
        ignore_gone(
            self.conn
                .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME),
            "set input focus",
        );
        if let Err(e) = self.send_protocol(window, self.atoms.wm_take_focus) {
            log::debug!("WM_TAKE_FOCUS for {:#x} failed: {}", window, e);
        }

        let monitor = self.monitors.containing(&rect).index;
        self.monitors.set_current(monitor);

        if warp && !fullscreen && rect.width > 0 {
            // Near the bottom-right corner, clamped to the virtual screen
            let x = (rect.x + rect.width as i32 - 16).clamp(0, self.screen_width as i32 - 1);
            let y = (rect.y + rect.height as i32 - 16).clamp(0, self.screen_height as i32 - 1);
            ignore_gone(
                self.conn
                    .warp_pointer(NONE, self.root, 0, 0, 0, 0, x as i16, y as i16),
                "pointer warp",
            );
        }
        let _ = self.conn.flush();
    }

    /// Put a client into fullscreen or take it out. Entering saves the
    /// grid rectangle and covers the containing monitor borderless;
    /// leaving restores both. Either transition is announced with a
    /// _NET_WM_STATE client message.
    pub fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        if client.fullscreen == fullscreen {
            return Ok(());
        }
        let window = client.window;

        if fullscreen {
            let monitor_rect = self.monitors.containing(&client.rect).rect;
            if let Some(client) = self.clients.get_mut(id) {
                client.enter_fullscreen();
                client.rect = monitor_rect;
            }
            let configure = ConfigureWindowAux::new()
                .x(monitor_rect.x)
                .y(monitor_rect.y)
                .width(monitor_rect.width)
                .height(monitor_rect.height)
                .border_width(0)
                .stack_mode(StackMode::ABOVE);
            ignore_gone(self.conn.configure_window(window, &configure), "fullscreen");
        } else {
            let restored = {
                let Some(client) = self.clients.get_mut(id) else {
                    return Ok(());
                };
                client.leave_fullscreen();
                client.rect
            };
            let configure = ConfigureWindowAux::new().border_width(self.style.border_width);
            ignore_gone(
                self.conn.configure_window(window, &configure),
                "restore border",
            );
            self.resize_client(id, restored);
        }

        let state = if fullscreen { 1 } else { 0 };
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.net_wm_state,
            [state, self.atoms.net_wm_state_fullscreen, 0, 0, 0],
        );
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
            event,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    /// Close the focused window: WM_DELETE_WINDOW if the client speaks
    /// the protocol, a forced kill otherwise.
    pub fn close_focused(&mut self) -> Result<()> {
        let Some(client) = self.clients.focused_client() else {
            return Ok(());
        };
        let window = client.window;

        if self.supports_protocol(window, self.atoms.wm_delete_window)? {
            self.send_protocol(window, self.atoms.wm_delete_window)?;
        } else {
            log::info!("Window {:#x} has no WM_DELETE_WINDOW, killing it", window);
            self.conn.grab_server()?;
            ignore_gone(self.conn.kill_client(window), "kill client");
            self.conn.ungrab_server()?;
        }
        self.conn.flush()?;
        Ok(())
    }

    /// Whether a window lists a protocol atom in WM_PROTOCOLS
    fn supports_protocol(&self, window: Window, protocol: u32) -> Result<bool> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                self.atoms.wm_protocols,
                AtomEnum::ATOM,
                0,
                u32::MAX,
            )?
            .reply();
        match reply {
            Ok(reply) => Ok(reply
                .value32()
                .map(|mut atoms| atoms.any(|a| a == protocol))
                .unwrap_or(false)),
            // The window may be gone already
            Err(_) => Ok(false),
        }
    }

    /// Send an ICCCM protocol message (WM_DELETE_WINDOW, WM_TAKE_FOCUS)
    fn send_protocol(&self, window: Window, protocol: u32) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [protocol, CURRENT_TIME, 0, 0, 0],
        );
        ignore_gone(
            self.conn.send_event(false, window, EventMask::NO_EVENT, event),
            "protocol message",
        );
        Ok(())
    }

    /// Make another workspace current: every client everywhere is
    /// unmapped, then the target's clients are mapped and focus lands on
    /// the workspace's remembered client.
    pub fn switch_workspace(&mut self, target: usize) -> Result<()> {
        if !self.clients.switch_to(target) {
            return Ok(());
        }
        log::info!("Switching to workspace {}", target + 1);

        let all: Vec<Window> = self.clients.iter().map(|(_, c)| c.window).collect();
        for window in all {
            self.hidden_windows.insert(window);
            ignore_gone(self.conn.unmap_window(window), "workspace unmap");
        }
        for id in self.clients.clients_on(target).to_vec() {
            let Some(client) = self.clients.get(id) else { continue };
            let window = client.window;
            self.hidden_windows.remove(&window);
            ignore_gone(self.conn.map_window(window), "workspace map");
        }

        if let Some(focus) = self.clients.focused() {
            self.focus_client(focus, true);
        }
        self.arrange()?;
        self.conn.flush()?;
        Ok(())
    }

    /// Send the focused client to another workspace. Its window is
    /// hidden; focus falls back within the current workspace.
    pub fn move_focused_to_workspace(&mut self, target: usize) -> Result<()> {
        let Some(moved) = self.clients.move_focused_to(target) else {
            return Ok(());
        };
        log::info!("Moving focused window to workspace {}", target + 1);

        if let Some(client) = self.clients.get(moved) {
            let window = client.window;
            self.hidden_windows.insert(window);
            ignore_gone(self.conn.unmap_window(window), "move unmap");
        }
        if let Some(focus) = self.clients.focused() {
            self.focus_client(focus, false);
        }
        self.arrange()?;
        self.conn.flush()?;
        Ok(())
    }

    /// Select the adjacent monitor in the ring and focus a client there
    /// if the current workspace has one; otherwise just move the pointer.
    pub fn focus_adjacent_monitor(&mut self, offset: i32) {
        let target = self.monitors.adjacent_index(offset);
        self.monitors.set_current(target);

        let ws = self.clients.current_index();
        let candidate = self.clients.clients_on(ws).iter().copied().find(|&id| {
            self.clients
                .get(id)
                .map(|c| c.has_geometry() && self.monitors.containing(&c.rect).index == target)
                .unwrap_or(false)
        });
        if let Some(id) = candidate {
            self.focus_client(id, true);
        } else if let Some(monitor) = self.monitors.get(target) {
            let x = monitor.rect.center_x() as i16;
            let y = monitor.rect.center_y() as i16;
            ignore_gone(
                self.conn.warp_pointer(NONE, self.root, 0, 0, 0, 0, x, y),
                "monitor warp",
            );
            let _ = self.conn.flush();
        }
    }

    /// Move the focused client into the first free cell of the adjacent
    /// monitor. The workspace does not change; fullscreen clients stay put.
    pub fn move_focused_to_adjacent_monitor(&mut self, offset: i32) {
        let Some(id) = self.clients.focused() else {
            return;
        };
        let Some(client) = self.clients.get(id) else {
            return;
        };
        if client.fullscreen {
            return;
        }
        let source = self.monitors.containing(&client.rect).index;
        let target = self.monitors.adjacent_index(offset);
        if target == source {
            return;
        }

        self.place_in_free_cell(id, target);
        self.monitors.set_current(target);
        self.focus_client(id, true);
    }

    /// Show the overlay over the current monitor and start a selection.
    /// A no-op without a focused window to resize.
    pub fn enter_overlay(&mut self) -> Result<()> {
        if self.clients.focused().is_none() {
            return Ok(());
        }
        self.overlay.begin();

        let monitor_rect = self.monitors.current().rect;
        let (window, _) = self.ensure_overlay_window(&monitor_rect)?;

        let configure = ConfigureWindowAux::new()
            .x(monitor_rect.x)
            .y(monitor_rect.y)
            .width(monitor_rect.width)
            .height(monitor_rect.height)
            .stack_mode(StackMode::ABOVE);
        self.conn.configure_window(window, &configure)?;
        self.conn.map_window(window)?;
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        self.draw_overlay()?;
        self.conn.flush()?;
        Ok(())
    }

    /// Create the overlay window and its GC on first use
    fn ensure_overlay_window(&mut self, monitor_rect: &Rect) -> Result<(Window, Gcontext)> {
        if let Some(pair) = self.overlay_window {
            return Ok(pair);
        }

        let screen = &self.conn.setup().roots[self.screen_num];
        let window = self.conn.generate_id()?;
        let attrs = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(self.style.background)
            .event_mask(EventMask::EXPOSURE | EventMask::KEY_PRESS);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            monitor_rect.x as i16,
            monitor_rect.y as i16,
            monitor_rect.width as u16,
            monitor_rect.height as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &attrs,
        )?;

        // Let compositors render the overlay translucent
        let opacity = (0.85 * u32::MAX as f64) as u32;
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[opacity],
        )?;

        let gc = self.conn.generate_id()?;
        let gc_aux = CreateGCAux::new()
            .foreground(self.style.foreground)
            .background(self.style.background);
        self.conn.create_gc(gc, window, &gc_aux)?;

        self.overlay_window = Some((window, gc));
        Ok((window, gc))
    }

    /// Redraw the overlay: highlighted selection fills, cell outlines,
    /// cell labels, and the pending input line.
    pub fn draw_overlay(&mut self) -> Result<()> {
        let Some((window, gc)) = self.overlay_window else {
            return Ok(());
        };
        // Cells are drawn in window-local coordinates
        let monitor = self.monitors.current().rect;
        let local = Rect::new(0, 0, monitor.width, monitor.height);

        self.conn.clear_area(false, window, 0, 0, 0, 0)?;

        let mut fills = Vec::new();
        let mut outlines = Vec::new();
        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                let cell = self.grid.cell_rect(&local, row, col);
                let rectangle = Rectangle {
                    x: cell.x as i16,
                    y: cell.y as i16,
                    width: cell.width as u16,
                    height: cell.height as u16,
                };
                if self.overlay.is_selected(&self.grid, row, col) {
                    fills.push(rectangle);
                }
                outlines.push(rectangle);
            }
        }

        if !fills.is_empty() {
            self.conn
                .change_gc(gc, &ChangeGCAux::new().foreground(self.style.selection))?;
            self.conn.poly_fill_rectangle(window, gc, &fills)?;
        }
        self.conn
            .change_gc(gc, &ChangeGCAux::new().foreground(self.style.foreground))?;
        self.conn.poly_rectangle(window, gc, &outlines)?;

        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                let cell = self.grid.cell_rect(&local, row, col);
                let label = [self.grid.label_at(row, col) as u8];
                let x = (cell.x + cell.width as i32 / 2 - 3) as i16;
                let y = (cell.y + cell.height as i32 / 2 + 4) as i16;
                self.conn.image_text8(window, gc, x, y, &label)?;
            }
        }

        let mut pending = String::from("Input: ");
        if let Some(first) = self.overlay.first() {
            pending.push(first);
        }
        if let Some(second) = self.overlay.second() {
            pending.push(second);
        }
        self.conn.image_text8(
            window,
            gc,
            20,
            (local.height as i32 - 20) as i16,
            pending.as_bytes(),
        )?;

        self.conn.flush()?;
        Ok(())
    }

    /// Hide the overlay and return the input focus to the focused client
    pub fn hide_overlay(&mut self) {
        self.overlay.cancel();
        if let Some((window, _)) = self.overlay_window {
            ignore_gone(self.conn.unmap_window(window), "overlay unmap");
        }
        if let Some(focus) = self.clients.focused() {
            self.focus_client(focus, false);
        }
        let _ = self.conn.flush();
    }

    /// Commit a completed selection: show the final highlight briefly,
    /// then resize the focused window to the spanned rectangle.
    pub fn commit_overlay(&mut self) -> Result<()> {
        self.draw_overlay()?;
        self.conn.flush()?;
        std::thread::sleep(COMMIT_FLASH);

        if let (Some(id), Some((a, b))) =
            (self.clients.focused(), self.overlay.resolve(&self.grid))
        {
            let monitor = self.monitors.current().rect;
            let rect = self.grid.span_rect(&monitor, a, b);
            log::debug!(
                "Overlay selection {:?}..{:?} -> {}x{}+{}+{}",
                a,
                b,
                rect.width,
                rect.height,
                rect.x,
                rect.y
            );
            self.resize_client(id, rect);
            self.hide_overlay();
            self.focus_client(id, true);
        } else {
            self.hide_overlay();
        }
        Ok(())
    }

    /// Dispatch a bound action
    pub fn execute_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Spawn(command) => spawn::spawn_detached(command),
            Action::CloseWindow => self.close_focused()?,
            Action::ToggleFullscreen => {
                if let Some(id) = self.clients.focused() {
                    let fullscreen = self
                        .clients
                        .get(id)
                        .map(|c| c.fullscreen)
                        .unwrap_or(false);
                    self.set_fullscreen(id, !fullscreen)?;
                }
            }
            Action::EnterOverlay => self.enter_overlay()?,
            Action::FocusNext => {
                if let Some(id) = self.clients.cycle_target(true) {
                    self.focus_client(id, true);
                }
            }
            Action::FocusPrev => {
                if let Some(id) = self.clients.cycle_target(false) {
                    self.focus_client(id, true);
                }
            }
            Action::SwitchWorkspace(n) => self.switch_workspace(*n)?,
            Action::MoveToWorkspace(n) => self.move_focused_to_workspace(*n)?,
            Action::FocusMonitor(offset) => self.focus_adjacent_monitor(*offset),
            Action::MoveToMonitor(offset) => self.move_focused_to_adjacent_monitor(*offset),
            Action::Quit => {
                log::info!("Quit requested");
                self.running = false;
            }
        }
        Ok(())
    }

    /// Blocking event loop. Children spawned from bindings are reaped
    /// between events; the poll never blocks.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Entering event loop");
        while self.running {
            self.conn.flush()?;
            let event = self.conn.wait_for_event()?;
            if let Err(e) = self.handle_event(event) {
                log::error!("Error handling event: {:#}", e);
            }
            spawn::reap_children();
        }
        Ok(())
    }
}

/// Check a void request, swallowing the errors a vanished window causes.
/// Requests racing against window destruction are routine for a window
/// manager; anything else is logged.
fn ignore_gone(
    cookie: std::result::Result<VoidCookie<'_, RustConnection>, ConnectionError>,
    what: &str,
) {
    let result = match cookie {
        Ok(cookie) => cookie.check(),
        Err(e) => {
            log::warn!("{} failed: {}", what, e);
            return;
        }
    };
    match result {
        Ok(()) => {}
        Err(ReplyError::X11Error(e))
            if matches!(
                e.error_kind,
                ErrorKind::Window | ErrorKind::Drawable | ErrorKind::Match
            ) =>
        {
            log::debug!("{} raced with a disappearing window", what);
        }
        Err(e) => log::warn!("{} failed: {}", what, e),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version {
        eprintln!("gridwm {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(1);
    }

    let mut wm = Wm::new()?;
    wm.become_wm()?;
    wm.setup()?;
    log::info!("gridwm {} started", env!("CARGO_PKG_VERSION"));
    wm.run()?;
    Ok(())
}
