//! Mock virtual keyboard for unit testing.
//!
//! The real [`UinputKeyboard`](super::uinput::UinputKeyboard) needs root and
//! a kernel uinput module, and its output can only be observed by reading
//! another input device.  `MockVirtualKeyboard` records every write in
//! memory instead.
//!
//! The use case takes ownership of the device, so observations go through a
//! [`MockKeyboardProbe`] obtained before handing the mock over.  The probe
//! also counts how many times the device was dropped, which is how tests
//! check that the device is released exactly once.
//!
//! # Usage in tests
//!
//! ```ignore
//! let device = MockVirtualKeyboard::new();
//! let probe = device.probe();
//! let mut use_case = InjectKeysUseCase::new(KeyIdentifierTable::global(), Box::new(device));
//!
//! use_case.handle_event(&KeyEvent::press(KeyIdentifier::Char("a".into())));
//!
//! assert_eq!(probe.writes().len(), 2); // key + sync
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::inject_keys::{EmulationError, VirtualKeyboard};

/// One recorded device write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWrite {
    Key { code: u16, pressed: bool },
    Sync,
}

/// A mock keyboard that records all writes without touching the OS.
pub struct MockVirtualKeyboard {
    writes: Arc<Mutex<Vec<DeviceWrite>>>,
    drops: Arc<AtomicUsize>,
    /// When `true`, every write returns [`EmulationError::Write`].
    pub should_fail: bool,
    /// When `true`, the next write fails and the flag clears itself.
    pub fail_next: bool,
}

/// Read-only view of a [`MockVirtualKeyboard`] that outlives it.
#[derive(Clone)]
pub struct MockKeyboardProbe {
    writes: Arc<Mutex<Vec<DeviceWrite>>>,
    drops: Arc<AtomicUsize>,
}

impl MockVirtualKeyboard {
    pub fn new() -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            drops: Arc::new(AtomicUsize::new(0)),
            should_fail: false,
            fail_next: false,
        }
    }

    /// A mock whose writes always fail.
    pub fn failing() -> Self {
        let mut device = Self::new();
        device.should_fail = true;
        device
    }

    /// A mock whose first write fails and every later write succeeds.
    pub fn failing_once() -> Self {
        let mut device = Self::new();
        device.fail_next = true;
        device
    }

    pub fn probe(&self) -> MockKeyboardProbe {
        MockKeyboardProbe {
            writes: Arc::clone(&self.writes),
            drops: Arc::clone(&self.drops),
        }
    }

    fn record(&mut self, write: DeviceWrite) -> Result<(), EmulationError> {
        if std::mem::take(&mut self.fail_next) || self.should_fail {
            return Err(EmulationError::Write("injected failure".to_string()));
        }
        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(write);
        Ok(())
    }
}

impl Default for MockVirtualKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualKeyboard for MockVirtualKeyboard {
    fn emit_key(&mut self, code: u16, pressed: bool) -> Result<(), EmulationError> {
        self.record(DeviceWrite::Key { code, pressed })
    }

    fn synchronize(&mut self) -> Result<(), EmulationError> {
        self.record(DeviceWrite::Sync)
    }
}

impl Drop for MockVirtualKeyboard {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockKeyboardProbe {
    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<DeviceWrite> {
        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Only the key writes, as `(code, pressed)` pairs.
    pub fn keys(&self) -> Vec<(u16, bool)> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                DeviceWrite::Key { code, pressed } => Some((code, pressed)),
                DeviceWrite::Sync => None,
            })
            .collect()
    }

    /// How many times the mock device has been dropped.
    pub fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}
