//! InjectKeysUseCase: replays received key events on the virtual keyboard.
//!
//! This use case sits at the application layer and delegates to a
//! [`VirtualKeyboard`] trait object for the actual device writes.  The Linux
//! implementation lives in the infrastructure layer.
//!
//! Every outcome is local to one event: a key the table does not know is
//! logged and skipped, and a failed device write is logged and skipped.
//! Neither ends the session.

use keybridge_core::{KeyEvent, KeyIdentifierTable};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Error type for virtual keyboard operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    /// The virtual device could not be created.
    #[error("failed to create virtual keyboard: {0}")]
    DeviceCreation(String),
    /// Writing to the virtual device failed.
    #[error("virtual keyboard write failed: {0}")]
    Write(String),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// A virtual keyboard that accepts injection codes.
///
/// The device is released when the value is dropped.
pub trait VirtualKeyboard: Send {
    /// Writes one key-state change for `code`.
    fn emit_key(&mut self, code: u16, pressed: bool) -> Result<(), EmulationError>;

    /// Flushes pending key events so the OS processes them.
    fn synchronize(&mut self) -> Result<(), EmulationError>;
}

/// What happened to one received event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    Injected { code: u16 },
    /// The key has no entry in the table.
    Unmapped,
    /// The device rejected the write.
    Failed,
}

/// The Inject Keys use case.
pub struct InjectKeysUseCase {
    table: &'static KeyIdentifierTable,
    device: Box<dyn VirtualKeyboard>,
}

impl InjectKeysUseCase {
    /// Creates the use case around an already created device.
    pub fn new(table: &'static KeyIdentifierTable, device: Box<dyn VirtualKeyboard>) -> Self {
        Self { table, device }
    }

    /// Translates one event and writes it to the device, followed by a
    /// synchronization.
    pub fn handle_event(&mut self, event: &KeyEvent) -> Injection {
        let Some(code) = self.table.lookup(&event.key) else {
            warn!(%event, "no mapping for key; skipped");
            return Injection::Unmapped;
        };

        let written = self
            .device
            .emit_key(code, event.action.is_press())
            .and_then(|()| self.device.synchronize());
        match written {
            Ok(()) => {
                debug!(%event, code, "injected");
                Injection::Injected { code }
            }
            Err(e) => {
                error!(%event, code, "injection failed: {e}");
                Injection::Failed
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
