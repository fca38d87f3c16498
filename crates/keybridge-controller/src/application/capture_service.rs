//! CaptureService: decides what happens to every captured event.
//!
//! The input hook hands each event to [`CaptureService::deliver`] on the OS
//! callback thread.  From there:
//!
//! ```text
//! mouse activity ──────────────────────────────► trace log, dropped
//! hotkey press ────────────────────────────────► ControlToggle::restart_in_background
//! hotkey release ──────────────────────────────► ignored
//! other key ─► classify ─┬─ Blocked ───────────► dropped
//!                        ├─ Unserializable ────► warn, dropped
//!                        └─ Identified ─┬─ forwarding on ─► EventTransmitter::send
//!                                       └─ forwarding off ─► dropped
//! ```
//!
//! Nothing is queued: a key captured while forwarding is off is never sent
//! later, and a failed send is not retried.

use std::sync::{Arc, Weak};

use keybridge_core::{classify, Classification, KeyAction, KeyDescriptor, KeyEvent};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::application::control::ControlToggle;
use crate::infrastructure::input_capture::{CaptureHandler, CapturedEvent};

/// Error type for event transmission.
#[derive(Debug, Error)]
pub enum TransportError {
    /// There is no live connection to the target.
    #[error("not connected to the target")]
    NotConnected,

    /// The event could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] keybridge_core::ProtocolError),

    /// Writing to the connection failed.  The connection has been closed.
    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends key events to the target.
///
/// The production implementation writes to a TCP stream; tests use a
/// recording double.
pub trait EventTransmitter: Send + Sync {
    /// Sends one event synchronously.
    ///
    /// # Errors
    ///
    /// See [`TransportError`].  After an `Io` error the transmitter is
    /// disconnected and every later call returns `NotConnected`.
    fn send(&self, event: &KeyEvent) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Closes the connection.  Idempotent.
    fn close(&self);
}

/// What [`CaptureService::process_key`] did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The hotkey was pressed and a toggle was scheduled.
    ToggleScheduled,
    /// The hotkey was released.
    HotkeyReleased,
    Blocked,
    Unserializable,
    /// Forwarding is off; the key was discarded.
    Discarded,
    Sent(KeyEvent),
    SendFailed,
}

/// The [`CaptureHandler`] installed into the input hook.
pub struct CaptureService {
    hotkey: String,
    toggle: Arc<ControlToggle>,
    transmitter: Arc<dyn EventTransmitter>,
    me: Weak<CaptureService>,
}

impl CaptureService {
    /// Creates the service.  `hotkey` is a symbolic key name such as `"f12"`.
    pub fn new(
        hotkey: impl Into<String>,
        toggle: Arc<ControlToggle>,
        transmitter: Arc<dyn EventTransmitter>,
    ) -> Arc<Self> {
        let hotkey = hotkey.into().to_lowercase();
        Arc::new_cyclic(|me| Self {
            hotkey,
            toggle,
            transmitter,
            me: me.clone(),
        })
    }

    /// This service as a handler, for installing into the hook.
    pub fn handler(self: &Arc<Self>) -> Arc<dyn CaptureHandler> {
        Arc::clone(self) as Arc<dyn CaptureHandler>
    }

    /// Applies the capture rules to one key.
    pub fn process_key(&self, key: KeyDescriptor, action: KeyAction) -> Disposition {
        if key.is_special(&self.hotkey) {
            if !action.is_press() {
                return Disposition::HotkeyReleased;
            }
            return self.schedule_toggle();
        }

        let identifier = match classify(&key) {
            Classification::Identified(identifier) => identifier,
            Classification::Blocked => {
                debug!(?key, "blocked key dropped");
                return Disposition::Blocked;
            }
            Classification::Unserializable => {
                warn!(?key, "key has no code and no character; dropped");
                return Disposition::Unserializable;
            }
        };

        if !self.toggle.is_forwarding() {
            return Disposition::Discarded;
        }

        let event = KeyEvent::new(action, identifier);
        match self.transmitter.send(&event) {
            Ok(()) => {
                debug!(%event, "forwarded");
                Disposition::Sent(event)
            }
            Err(e) => {
                debug!(%event, "not forwarded: {e}");
                Disposition::SendFailed
            }
        }
    }

    fn schedule_toggle(&self) -> Disposition {
        // Only fails while the service is being dropped.
        let Some(me) = self.me.upgrade() else {
            return Disposition::Discarded;
        };
        if let Err(e) = self.toggle.restart_in_background(me) {
            error!("failed to spawn toggle worker: {e}");
        }
        Disposition::ToggleScheduled
    }
}

impl CaptureHandler for CaptureService {
    fn deliver(&self, event: CapturedEvent) {
        match event {
            CapturedEvent::Key { key, action } => {
                self.process_key(key, action);
            }
            CapturedEvent::Mouse(activity) => trace!(?activity, "mouse activity"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::mock::MockInputHook;
    use crate::infrastructure::input_capture::MouseActivity;
    use keybridge_core::KeyIdentifier;
    use std::sync::Mutex;
    use std::time::Duration;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingTransmitter {
        sent: Mutex<Vec<KeyEvent>>,
        should_fail: bool,
    }

    impl EventTransmitter for RecordingTransmitter {
        fn send(&self, event: &KeyEvent) -> Result<(), TransportError> {
            if self.should_fail {
                return Err(TransportError::NotConnected);
            }
            self.sent.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.should_fail
        }

        fn close(&self) {}
    }

    struct Fixture {
        service: Arc<CaptureService>,
        toggle: Arc<ControlToggle>,
        hook: Arc<MockInputHook>,
        tx: Arc<RecordingTransmitter>,
    }

    fn make_fixture(tx: RecordingTransmitter) -> Fixture {
        let hook = Arc::new(MockInputHook::new());
        let toggle = Arc::new(ControlToggle::new(hook.clone(), Duration::ZERO));
        let tx = Arc::new(tx);
        let service = CaptureService::new("f12", toggle.clone(), tx.clone());
        toggle.start(service.handler()).expect("start");
        Fixture { service, toggle, hook, tx }
    }

    fn enable_forwarding(f: &Fixture) {
        f.toggle.toggle(f.service.handler()).expect("toggle");
    }

    // ── Forwarding gate ───────────────────────────────────────────────────────

    #[test]
    fn test_key_discarded_when_forwarding_disabled() {
        // Arrange
        let f = make_fixture(RecordingTransmitter::default());

        // Act
        let d = f.service.process_key(KeyDescriptor::char("a"), KeyAction::Press);

        // Assert
        assert_eq!(d, Disposition::Discarded);
        assert!(f.tx.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_sent_when_forwarding_enabled() {
        // Arrange
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        // Act
        f.service.process_key(KeyDescriptor::char("a"), KeyAction::Press);
        f.service.process_key(KeyDescriptor::char("a"), KeyAction::Release);

        // Assert
        let sent = f.tx.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                KeyEvent::press(KeyIdentifier::Char("a".into())),
                KeyEvent::release(KeyIdentifier::Char("a".into())),
            ]
        );
    }

    #[test]
    fn test_keys_captured_while_disabled_are_not_sent_later() {
        let f = make_fixture(RecordingTransmitter::default());
        f.service.process_key(KeyDescriptor::char("x"), KeyAction::Press);

        enable_forwarding(&f);
        f.service.process_key(KeyDescriptor::char("y"), KeyAction::Press);

        let sent = f.tx.sent.lock().unwrap();
        assert_eq!(*sent, vec![KeyEvent::press(KeyIdentifier::Char("y".into()))]);
    }

    // ── Hotkey ────────────────────────────────────────────────────────────────

    #[test]
    fn test_hotkey_press_schedules_toggle_and_is_not_sent() {
        // Arrange
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        // Act
        let d = f.service.process_key(KeyDescriptor::special("f12"), KeyAction::Press);

        // Assert
        assert_eq!(d, Disposition::ToggleScheduled);
        assert!(f.tx.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hotkey_release_is_ignored() {
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        let d = f.service.process_key(KeyDescriptor::special("f12"), KeyAction::Release);

        assert_eq!(d, Disposition::HotkeyReleased);
        assert!(f.tx.sent.lock().unwrap().is_empty());
        assert_eq!(f.hook.installs(), vec![false, true]);
    }

    #[test]
    fn test_hotkey_through_hook_flips_state_on_worker() {
        // Arrange
        let f = make_fixture(RecordingTransmitter::default());

        // Act
        f.hook
            .inject_event(CapturedEvent::key_press(KeyDescriptor::special("f12")));
        // The toggle runs on a worker thread; state() blocks until it is done
        // once the worker holds the lock, so poll briefly.
        let mut forwarding = false;
        for _ in 0..200 {
            forwarding = f.toggle.state().forwarding_enabled;
            if forwarding {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        // Assert
        assert!(forwarding);
        assert_eq!(f.hook.installs(), vec![false, true]);
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn test_vk_clear_is_blocked_even_when_forwarding() {
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        let d = f.service.process_key(KeyDescriptor::vk(12), KeyAction::Press);

        assert_eq!(d, Disposition::Blocked);
        assert!(f.tx.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_numpad_digit_is_sent_as_character() {
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        let d = f.service.process_key(KeyDescriptor::vk(101), KeyAction::Press);

        assert_eq!(d, Disposition::Sent(KeyEvent::press(KeyIdentifier::Char("5".into()))));
    }

    #[test]
    fn test_unserializable_key_is_dropped() {
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        let d = f
            .service
            .process_key(KeyDescriptor::Code { vk: None, ch: None }, KeyAction::Press);

        assert_eq!(d, Disposition::Unserializable);
    }

    #[test]
    fn test_send_failure_leaves_forwarding_enabled() {
        let f = make_fixture(RecordingTransmitter {
            should_fail: true,
            ..Default::default()
        });
        enable_forwarding(&f);

        let d = f.service.process_key(KeyDescriptor::char("a"), KeyAction::Press);

        assert_eq!(d, Disposition::SendFailed);
        assert!(f.toggle.state().forwarding_enabled);
    }

    #[test]
    fn test_mouse_activity_is_never_sent() {
        let f = make_fixture(RecordingTransmitter::default());
        enable_forwarding(&f);

        let suppressed = f
            .hook
            .inject_event(CapturedEvent::Mouse(MouseActivity::Move { x: 10.0, y: 20.0 }));

        assert!(!suppressed);
        assert!(f.tx.sent.lock().unwrap().is_empty());
    }
}
