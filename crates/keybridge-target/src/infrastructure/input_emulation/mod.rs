//! Virtual keyboard implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`.  Only Linux has one; every other platform
//! reports [`EmulationError::UnsupportedPlatform`] at startup.

use keybridge_core::KeyIdentifierTable;

use crate::application::inject_keys::{EmulationError, VirtualKeyboard};

pub mod mock;

#[cfg(target_os = "linux")]
pub mod uinput;

/// Creates the platform virtual keyboard, declaring every code reachable
/// through `table`.
///
/// # Errors
///
/// Returns [`EmulationError`] if the device cannot be created or the
/// platform has no virtual keyboard support.
pub fn platform_keyboard(
    name: &str,
    table: &KeyIdentifierTable,
) -> Result<Box<dyn VirtualKeyboard>, EmulationError> {
    #[cfg(target_os = "linux")]
    {
        let device = uinput::UinputKeyboard::create(name, &table.injection_codes())?;
        Ok(Box::new(device))
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (name, table);
        Err(EmulationError::UnsupportedPlatform(format!(
            "no virtual keyboard backend on {}",
            std::env::consts::OS
        )))
    }
}
