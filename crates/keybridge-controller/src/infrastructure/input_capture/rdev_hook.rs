//! Global keyboard and mouse hook built on `rdev::grab`.
//!
//! `rdev::grab` runs for the life of the process and cannot be stopped, so
//! the grab loop is started once, on a dedicated thread, the first time the
//! hook is installed.  "Stopping" the hook detaches the handler: the grab
//! callback then passes every event through untouched.  Installing attaches
//! a handler again together with its suppression setting.
//!
//! # Key descriptors
//!
//! Non-printable keys become [`KeyDescriptor::Special`] with the usual
//! lowercase names (`shift_l`, `page_down`, ...).  Printable keys become a
//! [`KeyDescriptor::Code`] carrying their unshifted US-layout character, so
//! `Shift+1` is sent as `shift_l` followed by `1` and the target's own
//! modifier state produces the `!`.  Numpad digits carry the Windows
//! virtual-key codes `96..=105` (and `110` for the decimal key) and no
//! character.  Keys `rdev` cannot name carry their raw code.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use keybridge_core::{KeyAction, KeyDescriptor};
use rdev::{Event, EventType, Key};
use tracing::{debug, error, info};

use super::{CaptureError, CaptureHandler, CapturedEvent, InputHook, MouseActivity};

/// How long to wait for `rdev::grab` to fail before assuming it is running.
/// Permission problems (macOS accessibility, missing hook rights) surface
/// immediately.
const GRAB_STARTUP_GRACE: Duration = Duration::from_millis(200);

struct Installed {
    suppress: bool,
    handler: Arc<dyn CaptureHandler>,
}

type Slot = Arc<Mutex<Option<Installed>>>;

/// [`InputHook`] backed by `rdev::grab` (Windows and macOS).
pub struct RdevInputHook {
    slot: Slot,
    grab_thread: Mutex<Option<JoinHandle<()>>>,
}

impl RdevInputHook {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            grab_thread: Mutex::new(None),
        }
    }

    fn ensure_grab_thread(&self) -> Result<(), CaptureError> {
        let mut thread_guard = self
            .grab_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if thread_guard.is_some() {
            return Ok(());
        }

        let slot = Arc::clone(&self.slot);
        let (err_tx, err_rx) = mpsc::channel::<String>();
        let handle = thread::Builder::new()
            .name("keybridge-hook".to_string())
            .spawn(move || {
                let result = rdev::grab(move |event| on_event(&slot, event));
                if let Err(e) = result {
                    error!("keyboard hook ended: {e:?}");
                    let _ = err_tx.send(format!("{e:?}"));
                }
            })
            .map_err(|e| CaptureError::HookInstallFailed(e.to_string()))?;

        match err_rx.recv_timeout(GRAB_STARTUP_GRACE) {
            Err(RecvTimeoutError::Timeout) => {
                info!("global keyboard hook running");
                *thread_guard = Some(handle);
                Ok(())
            }
            Ok(reason) => Err(CaptureError::HookInstallFailed(reason)),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::HookInstallFailed(
                "grab loop exited during startup".to_string(),
            )),
        }
    }
}

impl Default for RdevInputHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook for RdevInputHook {
    fn install(
        &self,
        suppress: bool,
        handler: Arc<dyn CaptureHandler>,
    ) -> Result<(), CaptureError> {
        self.ensure_grab_thread()?;
        let mut slot = lock(&self.slot);
        if slot.is_some() {
            return Err(CaptureError::AlreadyInstalled);
        }
        *slot = Some(Installed { suppress, handler });
        debug!(suppress, "hook handler attached");
        Ok(())
    }

    fn stop(&self) {
        if lock(&self.slot).take().is_some() {
            debug!("hook handler detached");
        }
    }
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Installed>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The grab callback.  Returning `None` swallows the event.
fn on_event(slot: &Slot, event: Event) -> Option<Event> {
    let (handler, suppress) = match lock(slot).as_ref() {
        Some(installed) => (Arc::clone(&installed.handler), installed.suppress),
        None => return Some(event),
    };
    let captured = to_captured_event(&event);
    let is_key = matches!(captured, CapturedEvent::Key { .. });
    handler.deliver(captured);
    if is_key && suppress {
        None
    } else {
        Some(event)
    }
}

// ── Event conversion ──────────────────────────────────────────────────────────

fn to_captured_event(event: &Event) -> CapturedEvent {
    match event.event_type {
        EventType::KeyPress(key) => CapturedEvent::Key {
            key: describe_key(key, event.name.as_deref()),
            action: KeyAction::Press,
        },
        EventType::KeyRelease(key) => CapturedEvent::Key {
            key: describe_key(key, event.name.as_deref()),
            action: KeyAction::Release,
        },
        EventType::MouseMove { x, y } => CapturedEvent::Mouse(MouseActivity::Move { x, y }),
        EventType::ButtonPress(_) => CapturedEvent::Mouse(MouseActivity::ButtonPress),
        EventType::ButtonRelease(_) => CapturedEvent::Mouse(MouseActivity::ButtonRelease),
        EventType::Wheel { delta_x, delta_y } => {
            CapturedEvent::Mouse(MouseActivity::Wheel { delta_x, delta_y })
        }
    }
}

/// Builds the descriptor for one `rdev` key.  `name` is the text the OS
/// produced for the event; it is only consulted for keys without a known
/// base character.
fn describe_key(key: Key, name: Option<&str>) -> KeyDescriptor {
    if let Some(special) = special_name(key) {
        return KeyDescriptor::special(special);
    }
    if let Some(vk) = numpad_vk(key) {
        return KeyDescriptor::vk(vk);
    }
    if let Some(ch) = base_char(key) {
        return KeyDescriptor::char(ch);
    }
    let printable = name
        .filter(|n| n.chars().count() == 1 && !n.chars().any(char::is_control))
        .map(str::to_string);
    let vk = match key {
        Key::Unknown(code) => Some(code),
        _ => None,
    };
    KeyDescriptor::Code { vk, ch: printable }
}

fn special_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::Alt => "alt_l",
        Key::AltGr => "alt_gr",
        Key::ControlLeft => "ctrl_l",
        Key::ControlRight => "ctrl_r",
        Key::ShiftLeft => "shift_l",
        Key::ShiftRight => "shift_r",
        Key::MetaLeft => "cmd",
        Key::MetaRight => "cmd_r",
        Key::Backspace => "backspace",
        Key::CapsLock => "caps_lock",
        Key::Delete => "delete",
        Key::Escape => "esc",
        Key::Insert => "insert",
        Key::Return | Key::KpReturn => "enter",
        Key::Space => "space",
        Key::Tab => "tab",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "page_up",
        Key::PageDown => "page_down",
        Key::PrintScreen => "print_screen",
        Key::ScrollLock => "scroll_lock",
        Key::Pause => "pause",
        Key::NumLock => "num_lock",
        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",
        _ => return None,
    };
    Some(name)
}

fn numpad_vk(key: Key) -> Option<u32> {
    let vk = match key {
        Key::Kp0 => 96,
        Key::Kp1 => 97,
        Key::Kp2 => 98,
        Key::Kp3 => 99,
        Key::Kp4 => 100,
        Key::Kp5 => 101,
        Key::Kp6 => 102,
        Key::Kp7 => 103,
        Key::Kp8 => 104,
        Key::Kp9 => 105,
        Key::KpDelete => 110,
        _ => return None,
    };
    Some(vk)
}

fn base_char(key: Key) -> Option<&'static str> {
    let ch = match key {
        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",
        Key::Num0 => "0",
        Key::Minus | Key::KpMinus => "-",
        Key::Equal => "=",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::BackSlash | Key::IntlBackslash => "\\",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::BackQuote => "`",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::Slash | Key::KpDivide => "/",
        Key::KpMultiply => "*",
        Key::KpPlus => "+",
        _ => return None,
    };
    Some(ch)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn key_event(event_type: EventType, name: Option<&str>) -> Event {
        Event {
            time: SystemTime::now(),
            name: name.map(str::to_string),
            event_type,
        }
    }

    #[test]
    fn test_modifier_keys_are_special() {
        assert_eq!(describe_key(Key::ShiftLeft, None), KeyDescriptor::special("shift_l"));
        assert_eq!(describe_key(Key::AltGr, None), KeyDescriptor::special("alt_gr"));
        assert_eq!(describe_key(Key::F12, None), KeyDescriptor::special("f12"));
    }

    #[test]
    fn test_letter_uses_base_character_not_shifted_name() {
        assert_eq!(describe_key(Key::KeyA, Some("A")), KeyDescriptor::char("a"));
        assert_eq!(describe_key(Key::Num1, Some("!")), KeyDescriptor::char("1"));
    }

    #[test]
    fn test_numpad_digit_carries_windows_vk() {
        assert_eq!(describe_key(Key::Kp5, Some("5")), KeyDescriptor::vk(101));
        assert_eq!(describe_key(Key::KpDelete, None), KeyDescriptor::vk(110));
    }

    #[test]
    fn test_unknown_key_carries_raw_code_and_printable_name() {
        assert_eq!(
            describe_key(Key::Unknown(12), None),
            KeyDescriptor::Code { vk: Some(12), ch: None }
        );
        assert_eq!(
            describe_key(Key::Unknown(226), Some("<")),
            KeyDescriptor::Code { vk: Some(226), ch: Some("<".into()) }
        );
    }

    #[test]
    fn test_mouse_events_convert_to_activity() {
        let captured = to_captured_event(&key_event(EventType::MouseMove { x: 1.0, y: 2.0 }, None));
        assert_eq!(captured, CapturedEvent::Mouse(MouseActivity::Move { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn test_key_release_converts_with_release_action() {
        let captured = to_captured_event(&key_event(EventType::KeyRelease(Key::Escape), None));
        assert_eq!(captured, CapturedEvent::key_release(KeyDescriptor::special("esc")));
    }
}
