//! Protocol module containing the key event model, the JSON codec, and the
//! brace-matching stream reassembler.

pub mod codec;
pub mod event;
pub mod framing;

pub use codec::{decode_event, encode_event, ProtocolError};
pub use event::*;
pub use framing::{try_extract_frame, StreamReassembler};

/// TCP port the target listens on and the controller connects to.
pub const DEFAULT_PORT: u16 = 65432;
