//! Configuration file support for gridwm.
//!
//! Loads settings from ~/.config/gridwm/config.toml if it exists,
//! otherwise uses defaults. Also provides `Style` - the runtime
//! appearance struct with resolved color values - and the `Action`
//! type dispatched from the keybinding table.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::grid::Grid;

// =============================================================================
// Runtime configuration (resolved values)
// =============================================================================

/// Resolved appearance values used while issuing X requests
#[derive(Debug, Clone)]
pub struct Style {
    /// Padding between grid cells and at monitor edges
    pub padding: u32,
    /// Client border width
    pub border_width: u32,
    /// Overlay background color
    pub background: u32,
    /// Overlay grid line / label color
    pub foreground: u32,
    /// Overlay selected-cell fill color
    pub selection: u32,
    /// Border color for unfocused windows
    pub border_normal: u32,
    /// Border color for the focused window
    pub border_focused: u32,
    /// Root window background color
    pub root_background: u32,
}

impl Style {
    /// Resolve color strings from the file config, falling back per field
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            padding: config.appearance.padding,
            border_width: config.appearance.border_width,
            background: parse_color(&config.colors.background).unwrap_or(defaults.background),
            foreground: parse_color(&config.colors.foreground).unwrap_or(defaults.foreground),
            selection: parse_color(&config.colors.selection).unwrap_or(defaults.selection),
            border_normal: parse_color(&config.colors.border_normal)
                .unwrap_or(defaults.border_normal),
            border_focused: parse_color(&config.colors.border_focused)
                .unwrap_or(defaults.border_focused),
            root_background: parse_color(&config.colors.root_background)
                .unwrap_or(defaults.root_background),
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            padding: 10,
            border_width: 2,
            background: 0x1e1e2e,
            foreground: 0xcdd6f4,
            selection: 0x89b4fa,
            border_normal: 0x313244,
            border_focused: 0x89b4fa,
            root_background: 0x1e1e2e,
        }
    }
}

/// Window manager action, carried with its argument through dispatch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Run an external command, detached
    Spawn(String),
    /// Close the focused window gracefully
    CloseWindow,
    /// Toggle fullscreen on the focused window
    ToggleFullscreen,
    /// Enter the grid overlay selection mode
    EnterOverlay,
    /// Focus the next client on the current workspace
    FocusNext,
    /// Focus the previous client on the current workspace
    FocusPrev,
    /// Make workspace N current
    SwitchWorkspace(usize),
    /// Move the focused client to workspace N
    MoveToWorkspace(usize),
    /// Focus the next (+1) or previous (-1) monitor in the ring
    FocusMonitor(i32),
    /// Move the focused client to the next/previous monitor
    MoveToMonitor(i32),
    /// Exit the window manager
    Quit,
}

// =============================================================================
// File-based configuration (TOML parsing)
// =============================================================================

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub colors: ColorConfig,
    pub grid: GridConfig,
    pub commands: CommandConfig,
    pub keybindings: KeybindingConfig,
}

/// Appearance settings (padding, borders)
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub padding: u32,
    pub border_width: u32,
}

/// Color settings (hex strings like "#89b4fa")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub background: String,
    pub foreground: String,
    pub selection: String,
    pub border_normal: String,
    pub border_focused: String,
    pub root_background: String,
}

/// Grid shape: one string per row, one label character per cell
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub labels: Vec<String>,
}

/// External commands bound to the spawn keys
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub terminal: String,
    pub launcher: String,
}

/// Keybinding configuration (strings like "Mod4+Shift+1")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub spawn_terminal: Option<String>,
    pub spawn_launcher: Option<String>,
    pub close_window: Option<String>,
    pub toggle_fullscreen: Option<String>,
    pub enter_overlay: Option<String>,
    pub focus_next: Option<String>,
    pub focus_prev: Option<String>,
    pub focus_monitor_prev: Option<String>,
    pub focus_monitor_next: Option<String>,
    pub move_monitor_prev: Option<String>,
    pub move_monitor_next: Option<String>,
    pub quit: Option<String>,
    /// Modifier prefix for the generated workspace bindings:
    /// `<prefix>+N` switches, `<prefix>+Shift+N` moves (N = 1-9)
    pub workspace_modifier: String,
}

/// Parsed keybinding (ready for X11 grab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedBinding {
    pub keysym: u32,
    pub modifiers: u16,
}

impl Config {
    /// Load config from the default path (~/.config/gridwm/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridwm")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Build the layout grid from the configured label rows
    pub fn grid(&self) -> Grid {
        let labels = self
            .grid
            .labels
            .iter()
            .map(|row| row.chars().map(|c| c.to_ascii_lowercase()).collect())
            .collect();
        Grid::new(labels, self.appearance.padding)
    }

    /// Parse the keybinding table into a (modifiers, keysym) -> action map
    pub fn parse_keybindings(&self) -> HashMap<ParsedBinding, Action> {
        let mut bindings = HashMap::new();

        let mut insert = |key_str: &Option<String>, action: Action| {
            if let Some(s) = key_str {
                if let Some(parsed) = parse_key_binding(s) {
                    bindings.insert(parsed, action);
                } else {
                    log::warn!("Failed to parse keybinding: {}", s);
                }
            }
        };

        let kb = &self.keybindings;
        insert(
            &kb.spawn_terminal,
            Action::Spawn(self.commands.terminal.clone()),
        );
        insert(
            &kb.spawn_launcher,
            Action::Spawn(self.commands.launcher.clone()),
        );
        insert(&kb.close_window, Action::CloseWindow);
        insert(&kb.toggle_fullscreen, Action::ToggleFullscreen);
        insert(&kb.enter_overlay, Action::EnterOverlay);
        insert(&kb.focus_next, Action::FocusNext);
        insert(&kb.focus_prev, Action::FocusPrev);
        insert(&kb.focus_monitor_prev, Action::FocusMonitor(-1));
        insert(&kb.focus_monitor_next, Action::FocusMonitor(1));
        insert(&kb.move_monitor_prev, Action::MoveToMonitor(-1));
        insert(&kb.move_monitor_next, Action::MoveToMonitor(1));
        insert(&kb.quit, Action::Quit);

        // Workspace bindings: Mod+N switches, Mod+Shift+N moves
        for n in 1..=9usize {
            let switch = format!("{}+{}", kb.workspace_modifier, n);
            let mv = format!("{}+Shift+{}", kb.workspace_modifier, n);
            if let Some(parsed) = parse_key_binding(&switch) {
                bindings.insert(parsed, Action::SwitchWorkspace(n - 1));
            }
            if let Some(parsed) = parse_key_binding(&mv) {
                bindings.insert(parsed, Action::MoveToWorkspace(n - 1));
            }
        }

        bindings
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            padding: 10,
            border_width: 2,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "#1e1e2e".to_string(),
            foreground: "#cdd6f4".to_string(),
            selection: "#89b4fa".to_string(),
            border_normal: "#313244".to_string(),
            border_focused: "#89b4fa".to_string(),
            root_background: "#1e1e2e".to_string(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            labels: vec![
                "qwer".to_string(),
                "asdf".to_string(),
                "zxcv".to_string(),
            ],
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            terminal: "alacritty".to_string(),
            launcher: "rofi -show drun".to_string(),
        }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            spawn_terminal: Some("Mod4+Return".to_string()),
            spawn_launcher: Some("Mod4+p".to_string()),
            close_window: Some("Mod4+q".to_string()),
            toggle_fullscreen: Some("Mod4+f".to_string()),
            enter_overlay: Some("Mod4+space".to_string()),
            focus_next: Some("Mod4+j".to_string()),
            focus_prev: Some("Mod4+k".to_string()),
            focus_monitor_prev: Some("Mod4+comma".to_string()),
            focus_monitor_next: Some("Mod4+period".to_string()),
            move_monitor_prev: Some("Mod4+Shift+comma".to_string()),
            move_monitor_next: Some("Mod4+Shift+period".to_string()),
            quit: Some("Mod4+Shift+BackSpace".to_string()),
            workspace_modifier: "Mod4".to_string(),
        }
    }
}

/// Parse a key binding string like "Mod4+Shift+h" into keysym and modifiers
pub fn parse_key_binding(s: &str) -> Option<ParsedBinding> {
    let parts: Vec<&str> = s.split('+').collect();
    if parts.is_empty() {
        return None;
    }

    let mut modifiers: u16 = 0;
    let key_part = parts.last()?;

    // X11 modifier masks
    const SHIFT_MASK: u16 = 1;
    const CONTROL_MASK: u16 = 4;
    const MOD1_MASK: u16 = 8; // Alt
    const MOD4_MASK: u16 = 64; // Super/Win

    for part in &parts[..parts.len() - 1] {
        match part.to_lowercase().as_str() {
            "mod4" | "super" | "win" => modifiers |= MOD4_MASK,
            "shift" => modifiers |= SHIFT_MASK,
            "control" | "ctrl" => modifiers |= CONTROL_MASK,
            "mod1" | "alt" => modifiers |= MOD1_MASK,
            _ => {
                log::warn!("Unknown modifier: {}", part);
            }
        }
    }

    let keysym = key_to_keysym(key_part)?;
    Some(ParsedBinding { keysym, modifiers })
}

/// Convert key name to X11 keysym
fn key_to_keysym(key: &str) -> Option<u32> {
    let lower = key.to_lowercase();
    match lower.as_str() {
        "return" | "enter" => Some(0xff0d),
        "tab" => Some(0xff09),
        "escape" | "esc" => Some(0xff1b),
        "space" => Some(0x20),
        "backspace" => Some(0xff08),
        "delete" => Some(0xffff),
        "comma" | "," => Some(0x2c),
        "period" | "." => Some(0x2e),
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() || c.is_ascii_digit() => Some(c as u32),
                _ => {
                    log::warn!("Unknown key: {}", key);
                    None
                }
            }
        }
    }
}

/// Parse hex color string (e.g., "#89b4fa" or "89b4fa") to u32
pub fn parse_color(s: &str) -> Option<u32> {
    let s = s.trim_start_matches('#');
    u32::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_binding() {
        let binding = parse_key_binding("Mod4+Return").unwrap();
        assert_eq!(binding.keysym, 0xff0d);
        assert_eq!(binding.modifiers, 64); // Mod4

        let binding = parse_key_binding("Mod4+Shift+q").unwrap();
        assert_eq!(binding.keysym, 0x71);
        assert_eq!(binding.modifiers, 64 | 1); // Mod4 + Shift

        let binding = parse_key_binding("Mod4+Shift+comma").unwrap();
        assert_eq!(binding.keysym, 0x2c);
        assert_eq!(binding.modifiers, 64 | 1);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#89b4fa"), Some(0x89b4fa));
        assert_eq!(parse_color("1e1e2e"), Some(0x1e1e2e));
        assert_eq!(parse_color("#ffffff"), Some(0xffffff));
        assert_eq!(parse_color("not a color"), None);
    }

    #[test]
    fn test_default_keybindings() {
        let config = Config::default();
        let bindings = config.parse_keybindings();

        let find = |action: &Action| bindings.iter().find(|(_, a)| *a == action);
        assert!(find(&Action::Spawn("alacritty".to_string())).is_some());
        assert!(find(&Action::Quit).is_some());
        assert!(find(&Action::SwitchWorkspace(0)).is_some());
        assert!(find(&Action::SwitchWorkspace(8)).is_some());
        assert!(find(&Action::MoveToWorkspace(4)).is_some());
        assert!(find(&Action::FocusMonitor(-1)).is_some());
        assert!(find(&Action::MoveToMonitor(1)).is_some());

        // Switch and move for the same digit differ only by Shift
        let (switch, _) = find(&Action::SwitchWorkspace(0)).unwrap();
        let (mv, _) = find(&Action::MoveToWorkspace(0)).unwrap();
        assert_eq!(switch.keysym, mv.keysym);
        assert_eq!(mv.modifiers, switch.modifiers | 1);
    }

    #[test]
    fn test_default_grid() {
        let config = Config::default();
        let grid = config.grid();
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.cols, 4);
        assert_eq!(grid.padding, 10);
        assert_eq!(grid.position_of('q'), Some((0, 0)));
        assert_eq!(grid.position_of('v'), Some((2, 3)));
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
[appearance]
padding = 8
border_width = 1

[grid]
labels = ["qwertyu", "asdfghj", "zxcvbnm", "1234567"]

[keybindings]
quit = "Mod4+Control+BackSpace"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.appearance.padding, 8);
        let grid = config.grid();
        assert_eq!(grid.rows, 4);
        assert_eq!(grid.cols, 7);

        let bindings = config.parse_keybindings();
        let quit = bindings.iter().find(|(_, a)| **a == Action::Quit).unwrap();
        assert_eq!(quit.0.modifiers, 64 | 4);
    }
}
