//! Brace-matching stream reassembly.
//!
//! The controller writes encoded events back to back on a TCP stream with no
//! length prefix and no separator, and TCP delivers them in arbitrary chunks.
//! The target recovers the individual objects by scanning for the first `{`
//! and the first `}`:
//!
//! - if a `}` comes before any `{`, the bytes in front of the `{` are a stale
//!   fragment and are dropped;
//! - otherwise `{ ... }` is one frame, and scanning continues after it.
//!
//! This only works for flat objects whose values never contain a literal
//! brace, which holds for every [`KeyEvent`] the controller emits.

use crate::protocol::codec::{decode_event, ProtocolError};
use crate::protocol::event::KeyEvent;
use tracing::debug;

/// Extracts the first complete `{ ... }` span from `buf`.
///
/// Returns `(frame, remainder)`.  `frame` is `None` when the buffer holds no
/// complete span yet; the remainder is then the buffer with any stale prefix
/// (bytes before a `{` that follow an unmatched `}`) already removed, and the
/// caller should wait for more bytes.
///
/// # Examples
///
/// ```rust
/// use keybridge_core::try_extract_frame;
///
/// let (frame, rest) = try_extract_frame(b"}junk{\"a\":1}{\"b\"");
/// assert_eq!(frame, Some(&b"{\"a\":1}"[..]));
/// assert_eq!(rest, b"{\"b\"");
/// ```
pub fn try_extract_frame(buf: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let mut rest = buf;
    loop {
        let open = rest.iter().position(|&b| b == b'{');
        let close = rest.iter().position(|&b| b == b'}');
        let (Some(open), Some(close)) = (open, close) else {
            return (None, rest);
        };
        if close < open {
            rest = &rest[open..];
            continue;
        }
        return (Some(&rest[open..=close]), &rest[close + 1..]);
    }
}

/// Accumulates received bytes and yields decoded [`KeyEvent`]s in order.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    buffer: Vec<u8>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk received from the socket.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete frame and decodes it.
    ///
    /// Returns `None` when no complete frame is buffered.  A frame that fails
    /// to decode is consumed and returned as `Some(Err(_))` so the caller can
    /// log it and keep going.
    ///
    /// Bytes that can never belong to a frame (anything in front of the
    /// first `{`) are discarded here, so the buffer only ever holds the start
    /// of one unfinished frame.
    pub fn next_event(&mut self) -> Option<Result<KeyEvent, ProtocolError>> {
        let (frame, rest) = try_extract_frame(&self.buffer);
        let frame_len = frame.map_or(0, <[u8]>::len);
        let decoded = frame.map(decode_event);

        let mut consumed = self.buffer.len() - rest.len();
        if decoded.is_none() {
            consumed += rest.iter().position(|&b| b == b'{').unwrap_or(rest.len());
        }

        let discarded = consumed - frame_len;
        if discarded > 0 {
            debug!(discarded, "dropped bytes outside any frame");
        }
        self.buffer.drain(..consumed);
        decoded
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
