//! Key identifier tables for cross-platform keyboard event mapping.
//!
//! The controller names every key in one of three identifier spaces (see
//! [`IdentifierSpace`]).  The target resolves that name to a Linux
//! input-event code through the [`KeyIdentifierTable`], which is built once
//! from the static entry lists below and never changes afterwards.
//!
//! The symbolic names follow the vocabulary of common desktop input-hook
//! libraries (`shift_l`, `page_down`, `media_play_pause`, ...), so a
//! controller on Windows, macOS or X11 produces the same names.

pub mod classify;
pub mod linux_input;

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::protocol::event::{IdentifierSpace, KeyIdentifier};
use linux_input::*;

/// Symbolic (non-printable) key names.
pub const NAME_ENTRIES: &[(&str, u16)] = &[
    // Modifiers
    ("alt", KEY_LEFTALT),
    ("alt_l", KEY_LEFTALT),
    ("alt_r", KEY_RIGHTALT),
    ("alt_gr", KEY_RIGHTALT),
    ("cmd", KEY_LEFTMETA),
    ("cmd_l", KEY_LEFTMETA),
    ("cmd_r", KEY_RIGHTMETA),
    ("ctrl", KEY_LEFTCTRL),
    ("ctrl_l", KEY_LEFTCTRL),
    ("ctrl_r", KEY_RIGHTCTRL),
    ("shift", KEY_LEFTSHIFT),
    ("shift_l", KEY_LEFTSHIFT),
    ("shift_r", KEY_RIGHTSHIFT),
    // Editing
    ("backspace", KEY_BACKSPACE),
    ("delete", KEY_DELETE),
    ("enter", KEY_ENTER),
    ("esc", KEY_ESC),
    ("insert", KEY_INSERT),
    ("space", KEY_SPACE),
    ("tab", KEY_TAB),
    // Locks and system
    ("caps_lock", KEY_CAPSLOCK),
    ("num_lock", KEY_NUMLOCK),
    ("scroll_lock", KEY_SCROLLLOCK),
    ("print_screen", KEY_SYSRQ),
    ("pause", KEY_PAUSE),
    ("menu", KEY_MENU),
    // Navigation
    ("up", KEY_UP),
    ("down", KEY_DOWN),
    ("left", KEY_LEFT),
    ("right", KEY_RIGHT),
    ("home", KEY_HOME),
    ("end", KEY_END),
    ("page_up", KEY_PAGEUP),
    ("page_down", KEY_PAGEDOWN),
    // Function keys
    ("f1", KEY_F1),
    ("f2", KEY_F2),
    ("f3", KEY_F3),
    ("f4", KEY_F4),
    ("f5", KEY_F5),
    ("f6", KEY_F6),
    ("f7", KEY_F7),
    ("f8", KEY_F8),
    ("f9", KEY_F9),
    ("f10", KEY_F10),
    ("f11", KEY_F11),
    ("f12", KEY_F12),
    ("f13", KEY_F13),
    ("f14", KEY_F14),
    ("f15", KEY_F15),
    ("f16", KEY_F16),
    ("f17", KEY_F17),
    ("f18", KEY_F18),
    ("f19", KEY_F19),
    ("f20", KEY_F20),
    // Media
    ("media_next", KEY_NEXTSONG),
    ("media_play_pause", KEY_PLAYPAUSE),
    ("media_previous", KEY_PREVIOUSSONG),
    ("media_volume_down", KEY_VOLUMEDOWN),
    ("media_volume_mute", KEY_MUTE),
    ("media_volume_up", KEY_VOLUMEUP),
];

/// Printable characters, in their unshifted lowercase form.
///
/// Numpad digits and the numpad decimal point arrive as the main-row
/// characters, so they inject as main-row keys.  `*` and `+` only exist
/// unshifted on the keypad.
pub const CHAR_ENTRIES: &[(&str, u16)] = &[
    ("a", KEY_A),
    ("b", KEY_B),
    ("c", KEY_C),
    ("d", KEY_D),
    ("e", KEY_E),
    ("f", KEY_F),
    ("g", KEY_G),
    ("h", KEY_H),
    ("i", KEY_I),
    ("j", KEY_J),
    ("k", KEY_K),
    ("l", KEY_L),
    ("m", KEY_M),
    ("n", KEY_N),
    ("o", KEY_O),
    ("p", KEY_P),
    ("q", KEY_Q),
    ("r", KEY_R),
    ("s", KEY_S),
    ("t", KEY_T),
    ("u", KEY_U),
    ("v", KEY_V),
    ("w", KEY_W),
    ("x", KEY_X),
    ("y", KEY_Y),
    ("z", KEY_Z),
    ("1", KEY_1),
    ("2", KEY_2),
    ("3", KEY_3),
    ("4", KEY_4),
    ("5", KEY_5),
    ("6", KEY_6),
    ("7", KEY_7),
    ("8", KEY_8),
    ("9", KEY_9),
    ("0", KEY_0),
    ("-", KEY_MINUS),
    ("=", KEY_EQUAL),
    ("[", KEY_LEFTBRACE),
    ("]", KEY_RIGHTBRACE),
    ("\\", KEY_BACKSLASH),
    (";", KEY_SEMICOLON),
    ("'", KEY_APOSTROPHE),
    ("`", KEY_GRAVE),
    (",", KEY_COMMA),
    (".", KEY_DOT),
    ("/", KEY_SLASH),
    ("*", KEY_KPASTERISK),
    ("+", KEY_KPPLUS),
];

/// Immutable mapping from `(identifier space, value)` to an injection code.
///
/// Lookups are pure: they depend only on the static entries and the key.
#[derive(Debug)]
pub struct KeyIdentifierTable {
    names: HashMap<&'static str, u16>,
    chars: HashMap<&'static str, u16>,
}

impl KeyIdentifierTable {
    /// Returns the process-wide table, building it on first use.
    pub fn global() -> &'static KeyIdentifierTable {
        static TABLE: OnceLock<KeyIdentifierTable> = OnceLock::new();
        TABLE.get_or_init(Self::build)
    }

    fn build() -> Self {
        Self {
            names: NAME_ENTRIES.iter().copied().collect(),
            chars: CHAR_ENTRIES.iter().copied().collect(),
        }
    }

    /// Resolves a key to its injection code.
    ///
    /// String values are lowercased before the lookup, so `Char("A")` and
    /// `Char("a")` resolve to the same key.  The virtual-code space has no
    /// injectable entries: raw codes are platform specific and are only
    /// interpreted on the controller.
    pub fn lookup(&self, key: &KeyIdentifier) -> Option<u16> {
        match key {
            KeyIdentifier::Name(name) => self.names.get(name.to_lowercase().as_str()).copied(),
            KeyIdentifier::Char(ch) => self.chars.get(ch.to_lowercase().as_str()).copied(),
            KeyIdentifier::VirtualCode(_) => None,
        }
    }

    /// Returns `true` if `name` is a known symbolic key name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name.to_lowercase().as_str())
    }

    /// Every code reachable through the table: the capability set declared
    /// by the virtual keyboard.
    pub fn injection_codes(&self) -> BTreeSet<u16> {
        self.names.values().chain(self.chars.values()).copied().collect()
    }

    /// Number of entries in one identifier space.
    pub fn len(&self, space: IdentifierSpace) -> usize {
        match space {
            IdentifierSpace::Name => self.names.len(),
            IdentifierSpace::Char => self.chars.len(),
            IdentifierSpace::VirtualCode => 0,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
