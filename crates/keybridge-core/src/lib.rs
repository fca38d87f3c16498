//! # keybridge-core
//!
//! Shared library for KeyBridge containing the key event model, the JSON
//! stream codec, and the key identifier translation tables.
//!
//! This crate is used by both the controller and target applications.
//! It has zero dependencies on OS APIs, input hooks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! KeyBridge lets the keyboard of one computer (the "controller") type on a
//! second computer (the "target").  A hotkey on the controller switches the
//! keyboard between local use and forwarding.  While forwarding, every
//! keystroke is swallowed locally and sent over TCP to the target, which
//! replays it through a virtual keyboard device.
//!
//! This crate (`keybridge-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How key events travel over the network.  Each event is a
//!   small flat JSON object; objects are written back to back with no length
//!   prefix, and the receiver recovers them by brace matching.
//!
//! - **`keymap`** – How a captured key is named on the wire (symbolic name,
//!   literal character, or raw virtual-key code) and how the target turns
//!   that name into a Linux input-event code for injection.

pub mod keymap;
pub mod protocol;

pub use keymap::classify::{classify, Classification, KeyDescriptor};
pub use keymap::KeyIdentifierTable;
pub use protocol::codec::{decode_event, encode_event, ProtocolError};
pub use protocol::event::{IdentifierSpace, KeyAction, KeyEvent, KeyIdentifier};
pub use protocol::framing::{try_extract_frame, StreamReassembler};
