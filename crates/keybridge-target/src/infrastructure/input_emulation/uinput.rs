//! Linux virtual keyboard built on uinput through the `evdev` crate.
//!
//! Creating a uinput device needs write access to `/dev/uinput`, which in
//! practice means running as root.  The device exists for as long as the
//! [`UinputKeyboard`] value; dropping it closes the uinput file descriptor
//! and the kernel removes the device.

use std::collections::BTreeSet;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::info;

use crate::application::inject_keys::{EmulationError, VirtualKeyboard};

/// A uinput keyboard declaring exactly the given key codes.
pub struct UinputKeyboard {
    device: VirtualDevice,
    name: String,
}

impl UinputKeyboard {
    /// Creates the device.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::DeviceCreation`] if `/dev/uinput` cannot be
    /// opened or the kernel rejects the device.  The message mentions root
    /// because that is by far the most common cause.
    pub fn create(name: &str, codes: &BTreeSet<u16>) -> Result<Self, EmulationError> {
        let mut keys = AttributeSet::<Key>::new();
        for &code in codes {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(name).with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(|e: std::io::Error| {
                EmulationError::DeviceCreation(format!(
                    "{e} (creating a uinput device usually requires root)"
                ))
            })?;

        info!(name, keys = codes.len(), "virtual keyboard created");
        Ok(Self {
            device,
            name: name.to_string(),
        })
    }
}

impl VirtualKeyboard for UinputKeyboard {
    fn emit_key(&mut self, code: u16, pressed: bool) -> Result<(), EmulationError> {
        let event = InputEvent::new(EventType::KEY, code, i32::from(pressed));
        self.device
            .emit(&[event])
            .map_err(|e| EmulationError::Write(e.to_string()))
    }

    /// `emit` already terminates every batch with `SYN_REPORT`, so an empty
    /// batch writes a bare synchronization.
    fn synchronize(&mut self) -> Result<(), EmulationError> {
        self.device
            .emit(&[])
            .map_err(|e| EmulationError::Write(e.to_string()))
    }
}

impl Drop for UinputKeyboard {
    fn drop(&mut self) {
        info!(name = %self.name, "virtual keyboard released");
    }
}
