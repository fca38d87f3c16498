//! JSON codec for key events.
//!
//! Wire format (one object per event, no envelope, no separator):
//! ```text
//! {"type":"press","key_type":"char","value":"a"}
//! {"type":"release","key_type":"vk","value":255}
//! ```
//! `type` is `"press"` or `"release"`, `key_type` is `"name"`, `"char"` or
//! `"vk"`, and `value` is a string for the first two spaces and an integer
//! for `"vk"`.  Consecutive objects are written back to back; see
//! [`crate::protocol::framing`] for how the receiver splits them again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::event::{IdentifierSpace, KeyAction, KeyEvent, KeyIdentifier};

/// Errors that can occur during event encoding or decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The event could not be serialized.
    #[error("failed to encode key event: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a valid key event object.
    #[error("malformed frame {frame:?}: {source}")]
    MalformedFrame {
        frame: String,
        #[source]
        source: serde_json::Error,
    },

    /// The `value` field has the wrong type for the declared `key_type`.
    #[error("key_type \"{space}\" does not accept value {value}")]
    InconsistentIdentifier { space: IdentifierSpace, value: String },
}

// ── Wire representation ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireEventRef<'a> {
    #[serde(rename = "type")]
    action: KeyAction,
    key_type: IdentifierSpace,
    value: WireValueRef<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireValueRef<'a> {
    Text(&'a str),
    Code(u32),
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    action: KeyAction,
    key_type: IdentifierSpace,
    value: WireValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Code(u32),
    Text(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`KeyEvent`] into its compact JSON object.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use keybridge_core::{encode_event, KeyEvent, KeyIdentifier};
///
/// let bytes = encode_event(&KeyEvent::press(KeyIdentifier::Char("a".into()))).unwrap();
/// assert_eq!(bytes, br#"{"type":"press","key_type":"char","value":"a"}"#);
/// ```
pub fn encode_event(event: &KeyEvent) -> Result<Vec<u8>, ProtocolError> {
    let value = match &event.key {
        KeyIdentifier::Name(name) => WireValueRef::Text(name),
        KeyIdentifier::Char(ch) => WireValueRef::Text(ch),
        KeyIdentifier::VirtualCode(vk) => WireValueRef::Code(*vk),
    };
    let wire = WireEventRef {
        action: event.action,
        key_type: event.key.space(),
        value,
    };
    serde_json::to_vec(&wire).map_err(ProtocolError::Encode)
}

/// Decodes one JSON object into a [`KeyEvent`].
///
/// Unknown extra fields are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if `frame` is not a JSON object
/// with the three expected fields, and
/// [`ProtocolError::InconsistentIdentifier`] if `value` has the wrong type for
/// `key_type`.
pub fn decode_event(frame: &[u8]) -> Result<KeyEvent, ProtocolError> {
    let wire: WireEvent =
        serde_json::from_slice(frame).map_err(|source| ProtocolError::MalformedFrame {
            frame: String::from_utf8_lossy(frame).into_owned(),
            source,
        })?;

    let key = match (wire.key_type, wire.value) {
        (IdentifierSpace::Name, WireValue::Text(name)) => KeyIdentifier::Name(name),
        (IdentifierSpace::Char, WireValue::Text(ch)) => KeyIdentifier::Char(ch),
        (IdentifierSpace::VirtualCode, WireValue::Code(vk)) => KeyIdentifier::VirtualCode(vk),
        (space, WireValue::Code(vk)) => {
            return Err(ProtocolError::InconsistentIdentifier {
                space,
                value: vk.to_string(),
            })
        }
        (space, WireValue::Text(text)) => {
            return Err(ProtocolError::InconsistentIdentifier {
                space,
                value: format!("{text:?}"),
            })
        }
    };

    Ok(KeyEvent::new(wire.action, key))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
