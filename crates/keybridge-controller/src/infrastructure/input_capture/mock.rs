//! Mock input hook for unit testing.
//!
//! Allows tests to inject synthetic [`CapturedEvent`]s without a real OS
//! hook, and records every `install`/`stop` call for later assertions.

use std::sync::{Arc, Mutex, PoisonError};

use super::{CaptureError, CaptureHandler, CapturedEvent, InputHook};

#[derive(Default)]
struct MockHookState {
    handler: Option<Arc<dyn CaptureHandler>>,
    suppress: bool,
    installs: Vec<bool>,
    stops: u32,
}

/// A mock implementation of [`InputHook`] that records calls and lets tests
/// inject events.
#[derive(Default)]
pub struct MockInputHook {
    state: Mutex<MockHookState>,
}

impl MockInputHook {
    /// Creates a new, uninstalled mock hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `true` if the installed hook would have withheld the event
    /// from local applications.  An event injected while the hook is stopped
    /// reaches nobody and returns `false`.
    pub fn inject_event(&self, event: CapturedEvent) -> bool {
        let (handler, suppress) = {
            let state = self.lock();
            (state.handler.clone(), state.suppress)
        };
        let Some(handler) = handler else {
            return false;
        };
        let is_key = matches!(event, CapturedEvent::Key { .. });
        handler.deliver(event);
        is_key && suppress
    }

    /// The `suppress` argument of every successful `install`, in call order.
    pub fn installs(&self) -> Vec<bool> {
        self.lock().installs.clone()
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> u32 {
        self.lock().stops
    }

    /// Returns `true` while a handler is installed.
    pub fn is_installed(&self) -> bool {
        self.lock().handler.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockHookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputHook for MockInputHook {
    fn install(
        &self,
        suppress: bool,
        handler: Arc<dyn CaptureHandler>,
    ) -> Result<(), CaptureError> {
        let mut state = self.lock();
        if state.handler.is_some() {
            return Err(CaptureError::AlreadyInstalled);
        }
        state.handler = Some(handler);
        state.suppress = suppress;
        state.installs.push(suppress);
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.lock();
        state.handler = None;
        state.suppress = false;
        state.stops += 1;
    }
}
