//! The key event model shared by the controller and the target.
//!
//! A [`KeyEvent`] is the unit that travels over the wire: one press or one
//! release of one key.  The key itself is named in one of three
//! *identifier spaces* (see [`IdentifierSpace`]), and the target resolves the
//! name against the matching table in [`crate::keymap::KeyIdentifierTable`].

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Key action ────────────────────────────────────────────────────────────────

/// Whether the key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Press,
    Release,
}

impl KeyAction {
    /// The key state value written to the virtual device: `1` for press, `0`
    /// for release.
    pub fn state(self) -> i32 {
        match self {
            KeyAction::Press => 1,
            KeyAction::Release => 0,
        }
    }

    pub fn is_press(self) -> bool {
        matches!(self, KeyAction::Press)
    }
}

// ── Identifier spaces ─────────────────────────────────────────────────────────

/// Which naming scheme a [`KeyIdentifier`] belongs to.
///
/// The serialized form is the `key_type` field of the wire object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierSpace {
    /// Canonical lowercase symbolic name, e.g. `"shift_l"` or `"f5"`.
    #[serde(rename = "name")]
    Name,
    /// A literal printable character, e.g. `"a"` or `";"`.
    #[serde(rename = "char")]
    Char,
    /// A raw platform virtual-key code.
    #[serde(rename = "vk")]
    VirtualCode,
}

impl fmt::Display for IdentifierSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdentifierSpace::Name => "name",
            IdentifierSpace::Char => "char",
            IdentifierSpace::VirtualCode => "vk",
        };
        f.write_str(s)
    }
}

/// A key named in exactly one identifier space.
///
/// Carrying the value inside the variant keeps the space and the runtime
/// type of the value consistent: a `VirtualCode` is always an integer and the
/// other two spaces are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyIdentifier {
    Name(String),
    Char(String),
    VirtualCode(u32),
}

impl KeyIdentifier {
    /// Returns the identifier space this key is named in.
    pub fn space(&self) -> IdentifierSpace {
        match self {
            KeyIdentifier::Name(_) => IdentifierSpace::Name,
            KeyIdentifier::Char(_) => IdentifierSpace::Char,
            KeyIdentifier::VirtualCode(_) => IdentifierSpace::VirtualCode,
        }
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIdentifier::Name(name) => write!(f, "name:{name}"),
            KeyIdentifier::Char(ch) => write!(f, "char:{ch:?}"),
            KeyIdentifier::VirtualCode(vk) => write!(f, "vk:{vk}"),
        }
    }
}

// ── Key event ─────────────────────────────────────────────────────────────────

/// One key press or release, as captured on the controller and replayed on
/// the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: KeyIdentifier,
}

impl KeyEvent {
    pub fn new(action: KeyAction, key: KeyIdentifier) -> Self {
        Self { action, key }
    }

    pub fn press(key: KeyIdentifier) -> Self {
        Self::new(KeyAction::Press, key)
    }

    pub fn release(key: KeyIdentifier) -> Self {
        Self::new(KeyAction::Release, key)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            KeyAction::Press => "press",
            KeyAction::Release => "release",
        };
        write!(f, "{action} {}", self.key)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
