//! X11 event dispatch.
//!
//! One handler per consumed event kind, separated from main.rs for
//! maintainability. The key-press handler forks on overlay mode: while
//! the overlay is up, keys feed the selection buffer instead of the
//! binding table.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ButtonPressEvent, ClientMessageEvent, ConnectionExt, DestroyNotifyEvent, EnterNotifyEvent,
    ExposeEvent, KeyPressEvent, MapRequestEvent, ModMask, NotifyDetail, NotifyMode,
    UnmapNotifyEvent,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::config::ParsedBinding;
use crate::overlay::KeyOutcome;
use crate::Wm;

const XK_ESCAPE: u32 = 0xff1b;
const XK_BACKSPACE: u32 = 0xff08;

/// _NET_WM_STATE client message actions
const STATE_REMOVE: u32 = 0;
const STATE_ADD: u32 = 1;
const STATE_TOGGLE: u32 = 2;

/// Keycode-to-keysym table fetched once at startup
pub struct KeyboardMap {
    min_keycode: u8,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyboardMap {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;
        let mapping = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;
        Ok(Self {
            min_keycode,
            keysyms_per_keycode: mapping.keysyms_per_keycode as usize,
            keysyms: mapping.keysyms,
        })
    }

    /// Unshifted keysym for a keycode (column 0 of the mapping)
    pub fn keysym(&self, keycode: u8) -> u32 {
        let index = (keycode.saturating_sub(self.min_keycode)) as usize * self.keysyms_per_keycode;
        self.keysyms.get(index).copied().unwrap_or(0)
    }

    /// First keycode producing a keysym, for key grabs
    pub fn keycode(&self, keysym: u32) -> Option<u8> {
        self.keysyms
            .chunks(self.keysyms_per_keycode.max(1))
            .position(|chunk| chunk.contains(&keysym))
            .map(|offset| self.min_keycode + offset as u8)
    }
}

impl Wm {
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::MapRequest(e) => self.handle_map_request(e),
            Event::UnmapNotify(e) => self.handle_unmap_notify(e),
            Event::DestroyNotify(e) => self.handle_destroy_notify(e),
            Event::EnterNotify(e) => self.handle_enter_notify(e),
            Event::ButtonPress(e) => self.handle_button_press(e),
            Event::ClientMessage(e) => self.handle_client_message(e),
            Event::KeyPress(e) => self.handle_key_press(e),
            Event::Expose(e) => self.handle_expose(e),
            Event::RandrScreenChangeNotify(_) => self.handle_screen_change(),
            Event::Error(e) => {
                log::debug!("X11 error event: {:?}", e);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_map_request(&mut self, event: MapRequestEvent) -> Result<()> {
        self.manage_window(event.window)
    }

    /// Unmaps we caused ourselves (workspace switches, moves) are
    /// filtered out through the hidden-window set; everything else means
    /// the client withdrew its window.
    fn handle_unmap_notify(&mut self, event: UnmapNotifyEvent) -> Result<()> {
        if event.event != self.root {
            return Ok(());
        }
        if self.hidden_windows.contains(&event.window) {
            return Ok(());
        }
        self.unmanage_window(event.window)
    }

    fn handle_destroy_notify(&mut self, event: DestroyNotifyEvent) -> Result<()> {
        self.unmanage_window(event.window)
    }

    /// Focus follows the pointer into a managed window
    fn handle_enter_notify(&mut self, event: EnterNotifyEvent) -> Result<()> {
        if event.mode != NotifyMode::NORMAL || event.detail == NotifyDetail::INFERIOR {
            return Ok(());
        }
        if self.overlay.is_active() {
            return Ok(());
        }
        if let Some(id) = self.clients.find_window(event.event) {
            if self.clients.focused() != Some(id) {
                self.focus_client(id, false);
            }
        }
        Ok(())
    }

    /// Click-to-focus for clicks that reach the root
    fn handle_button_press(&mut self, event: ButtonPressEvent) -> Result<()> {
        let window = if event.child != x11rb::NONE {
            event.child
        } else {
            event.event
        };
        if let Some(id) = self.clients.find_window(window) {
            self.focus_client(id, true);
        }
        Ok(())
    }

    /// _NET_WM_STATE fullscreen requests from clients
    fn handle_client_message(&mut self, event: ClientMessageEvent) -> Result<()> {
        if event.type_ != self.atoms.net_wm_state || event.format != 32 {
            return Ok(());
        }
        let data = event.data.as_data32();
        let property = data[1];
        if property != self.atoms.net_wm_state_fullscreen {
            return Ok(());
        }
        let Some(id) = self.clients.find_window(event.window) else {
            return Ok(());
        };

        let fullscreen = match data[0] {
            STATE_ADD => true,
            STATE_REMOVE => false,
            STATE_TOGGLE => !self
                .clients
                .get(id)
                .map(|c| c.fullscreen)
                .unwrap_or(false),
            other => {
                log::debug!("Ignoring _NET_WM_STATE action {}", other);
                return Ok(());
            }
        };
        self.set_fullscreen(id, fullscreen)
    }

    fn handle_key_press(&mut self, event: KeyPressEvent) -> Result<()> {
        let keysym = self.keymap.keysym(event.detail);

        if self.overlay.is_active() {
            return self.handle_overlay_key(keysym);
        }

        // Lock modifiers must not change what a chord means
        let lock_mask = u16::from(ModMask::LOCK) | u16::from(ModMask::M2);
        let modifiers = u16::from(event.state) & !lock_mask;
        let binding = ParsedBinding { keysym, modifiers };
        if let Some(action) = self.keybindings.get(&binding).cloned() {
            self.execute_action(&action)?;
        }
        Ok(())
    }

    /// Keys while the overlay is up: escape cancels, backspace clears the
    /// most recent pick, labels fill the two-slot buffer. The second
    /// label commits the selection.
    fn handle_overlay_key(&mut self, keysym: u32) -> Result<()> {
        match keysym {
            XK_ESCAPE => {
                self.hide_overlay();
                Ok(())
            }
            XK_BACKSPACE => {
                self.overlay.backspace();
                self.draw_overlay()
            }
            _ => {
                let Some(ch) = char::from_u32(keysym).filter(|c| c.is_ascii_alphanumeric()) else {
                    return Ok(());
                };
                match self.overlay.accept_key(ch, &self.grid) {
                    KeyOutcome::Ignored => Ok(()),
                    KeyOutcome::Updated => self.draw_overlay(),
                    KeyOutcome::Complete => self.commit_overlay(),
                }
            }
        }
    }

    fn handle_expose(&mut self, event: ExposeEvent) -> Result<()> {
        let overlay_shown = self
            .overlay_window
            .map(|(window, _)| window == event.window)
            .unwrap_or(false);
        if overlay_shown && self.overlay.is_active() {
            self.draw_overlay()?;
        }
        Ok(())
    }

    /// Monitor topology changed: rebuild the registry and re-place any
    /// client that no longer has a home.
    fn handle_screen_change(&mut self) -> Result<()> {
        log::info!("Screen topology changed, re-reading monitors");
        self.refresh_monitors()?;
        self.arrange()?;
        self.conn.flush()?;
        Ok(())
    }
}
