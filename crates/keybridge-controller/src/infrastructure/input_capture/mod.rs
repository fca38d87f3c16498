//! Input capture infrastructure for the controller.
//!
//! On Windows and macOS this installs a global keyboard and mouse hook via
//! `rdev::grab`.  The hook calls a [`CaptureHandler`] for every event on the
//! OS callback thread, and decides per event whether the original keystroke
//! reaches local applications.
//!
//! # Suppression
//!
//! Whether keystrokes are swallowed locally is fixed when the hook is
//! installed.  Changing it means stopping the hook and installing it again
//! with the other setting; see
//! [`ControlToggle`](crate::application::control::ControlToggle).  Mouse
//! events always pass through.
//!
//! # Testability
//!
//! The [`InputHook`] trait lets unit tests drive the capture path with
//! synthetic events through [`mock::MockInputHook`].

use std::sync::Arc;

use keybridge_core::{KeyAction, KeyDescriptor};

pub mod mock;

#[cfg(any(target_os = "windows", target_os = "macos"))]
pub mod rdev_hook;

/// Mouse activity reported by the hook.  Observed and logged, never forwarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseActivity {
    Move { x: f64, y: f64 },
    ButtonPress,
    ButtonRelease,
    Wheel { delta_x: i64, delta_y: i64 },
}

/// One event delivered by the hook.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedEvent {
    Key { key: KeyDescriptor, action: KeyAction },
    Mouse(MouseActivity),
}

impl CapturedEvent {
    pub fn key_press(key: KeyDescriptor) -> Self {
        CapturedEvent::Key { key, action: KeyAction::Press }
    }

    pub fn key_release(key: KeyDescriptor) -> Self {
        CapturedEvent::Key { key, action: KeyAction::Release }
    }
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install input hook: {0}")]
    HookInstallFailed(String),
    #[error("input hook is already installed")]
    AlreadyInstalled,
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Receives every event the hook captures.
///
/// Called on the OS hook thread, so implementations must return quickly and
/// must never stop or reinstall the hook themselves.
pub trait CaptureHandler: Send + Sync {
    fn deliver(&self, event: CapturedEvent);
}

/// Abstracts the OS-level keyboard and mouse hook.
///
/// The production implementation uses `rdev`; tests use
/// [`mock::MockInputHook`].
pub trait InputHook: Send + Sync {
    /// Installs the hook.  While installed, every event goes to `handler`,
    /// and keyboard events are withheld from local applications when
    /// `suppress` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::AlreadyInstalled`] if the hook has not been
    /// stopped since the last install, or [`CaptureError::HookInstallFailed`]
    /// if the OS rejects the hook.
    fn install(&self, suppress: bool, handler: Arc<dyn CaptureHandler>)
        -> Result<(), CaptureError>;

    /// Removes the hook.  Events stop reaching the handler and pass through
    /// untouched.  Stopping a stopped hook is a no-op.
    fn stop(&self);
}

/// Returns the input hook for the current platform.
///
/// # Errors
///
/// Returns [`CaptureError::UnsupportedPlatform`] where no global hook is
/// available.
pub fn platform_hook() -> Result<Arc<dyn InputHook>, CaptureError> {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        Ok(Arc::new(rdev_hook::RdevInputHook::new()))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Err(CaptureError::UnsupportedPlatform(format!(
            "no global keyboard hook with suppression on {}",
            std::env::consts::OS
        )))
    }
}
