//! Turning a captured key into a wire identifier.
//!
//! Input hooks describe a key in one of two ways: a symbolic name for keys
//! that print nothing, or a raw virtual-key code plus (when the layout
//! produces one) the literal character.  [`classify`] decides which
//! identifier space the key is sent in.
//!
//! # Priority
//!
//! 1. Symbolic names are sent as `Name`, lowercased; `alt_gr` is folded into
//!    `alt_r` because the target has a single right-alt key.
//! 2. Virtual code 12 (`VK_CLEAR`, numpad 5 with NumLock off) is blocked.
//! 3. Numpad virtual codes are sent as the digit they print.
//! 4. A non-empty literal character is sent as `Char`.
//! 5. Any remaining virtual code is sent as `VirtualCode`.
//! 6. A key with neither a code nor a character cannot be serialized.

use crate::protocol::event::KeyIdentifier;

/// Windows `VK_CLEAR`: the numpad 5 key with NumLock off.
pub const VK_CLEAR: u32 = 12;

/// Windows numpad virtual codes and the character each one prints.
pub const NUMPAD_VK_CHARS: &[(u32, &str)] = &[
    (96, "0"),
    (97, "1"),
    (98, "2"),
    (99, "3"),
    (100, "4"),
    (101, "5"),
    (102, "6"),
    (103, "7"),
    (104, "8"),
    (105, "9"),
    (110, "."),
];

/// How an input hook describes a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    /// A symbolic, non-printable key such as `shift_l` or `f5`.
    Special { name: String },
    /// A key with a raw virtual code and/or the character it produced.
    Code { vk: Option<u32>, ch: Option<String> },
}

impl KeyDescriptor {
    pub fn special(name: impl Into<String>) -> Self {
        KeyDescriptor::Special { name: name.into() }
    }

    pub fn vk(vk: u32) -> Self {
        KeyDescriptor::Code { vk: Some(vk), ch: None }
    }

    pub fn char(ch: impl Into<String>) -> Self {
        KeyDescriptor::Code { vk: None, ch: Some(ch.into()) }
    }

    /// Returns `true` if this descriptor names the symbolic key `name`.
    pub fn is_special(&self, name: &str) -> bool {
        matches!(self, KeyDescriptor::Special { name: n } if n.eq_ignore_ascii_case(name))
    }
}

/// The outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Send the key under this identifier.
    Identified(KeyIdentifier),
    /// Drop the key without a trace on the wire.
    Blocked,
    /// The key carries nothing that can be put on the wire.
    Unserializable,
}

/// Classifies a captured key.  See the module docs for the priority order.
pub fn classify(key: &KeyDescriptor) -> Classification {
    match key {
        KeyDescriptor::Special { name } => {
            let name = name.to_lowercase();
            let name = if name == "alt_gr" { "alt_r".to_string() } else { name };
            Classification::Identified(KeyIdentifier::Name(name))
        }
        KeyDescriptor::Code { vk, ch } => {
            if *vk == Some(VK_CLEAR) {
                return Classification::Blocked;
            }
            if let Some(digit) = vk.and_then(numpad_char) {
                return Classification::Identified(KeyIdentifier::Char(digit.to_string()));
            }
            match (ch.as_deref().filter(|c| !c.is_empty()), vk) {
                (Some(c), _) => Classification::Identified(KeyIdentifier::Char(c.to_string())),
                (None, Some(vk)) => Classification::Identified(KeyIdentifier::VirtualCode(*vk)),
                (None, None) => Classification::Unserializable,
            }
        }
    }
}

fn numpad_char(vk: u32) -> Option<&'static str> {
    NUMPAD_VK_CHARS
        .iter()
        .find(|(code, _)| *code == vk)
        .map(|(_, ch)| *ch)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyIdentifierTable;

    fn identified(c: Classification) -> KeyIdentifier {
        match c {
            Classification::Identified(k) => k,
            other => panic!("expected Identified, got {other:?}"),
        }
    }

    #[test]
    fn test_special_key_uses_lowercased_name() {
        let c = classify(&KeyDescriptor::special("Shift_L"));
        assert_eq!(identified(c), KeyIdentifier::Name("shift_l".into()));
    }

    #[test]
    fn test_alt_gr_is_sent_as_alt_r() {
        let c = classify(&KeyDescriptor::special("alt_gr"));
        assert_eq!(identified(c), KeyIdentifier::Name("alt_r".into()));
    }

    #[test]
    fn test_vk_clear_is_blocked_even_with_character() {
        let key = KeyDescriptor::Code { vk: Some(VK_CLEAR), ch: Some("5".into()) };
        assert_eq!(classify(&key), Classification::Blocked);
    }

    #[test]
    fn test_numpad_five_is_sent_as_digit() {
        // Arrange
        let table = KeyIdentifierTable::global();

        // Act
        let key = identified(classify(&KeyDescriptor::vk(101)));

        // Assert
        assert_eq!(key, KeyIdentifier::Char("5".into()));
        assert_eq!(table.lookup(&key), table.lookup(&KeyIdentifier::Char("5".into())));
    }

    #[test]
    fn test_numpad_decimal_is_sent_as_dot() {
        let key = identified(classify(&KeyDescriptor::vk(110)));
        assert_eq!(key, KeyIdentifier::Char(".".into()));
    }

    #[test]
    fn test_numpad_code_wins_over_character() {
        let key = KeyDescriptor::Code { vk: Some(96), ch: Some("x".into()) };
        assert_eq!(identified(classify(&key)), KeyIdentifier::Char("0".into()));
    }

    #[test]
    fn test_character_wins_over_plain_vk() {
        let key = KeyDescriptor::Code { vk: Some(65), ch: Some("a".into()) };
        assert_eq!(identified(classify(&key)), KeyIdentifier::Char("a".into()));
    }

    #[test]
    fn test_empty_character_falls_back_to_vk() {
        let key = KeyDescriptor::Code { vk: Some(255), ch: Some(String::new()) };
        assert_eq!(identified(classify(&key)), KeyIdentifier::VirtualCode(255));
    }

    #[test]
    fn test_character_only() {
        assert_eq!(
            identified(classify(&KeyDescriptor::char(";"))),
            KeyIdentifier::Char(";".into())
        );
    }

    #[test]
    fn test_no_code_and_no_character_is_unserializable() {
        let key = KeyDescriptor::Code { vk: None, ch: None };
        assert_eq!(classify(&key), Classification::Unserializable);
    }

    #[test]
    fn test_is_special_ignores_case() {
        assert!(KeyDescriptor::special("F12").is_special("f12"));
        assert!(!KeyDescriptor::vk(123).is_special("f12"));
    }
}
