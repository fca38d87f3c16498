//! Forwarding state and the hotkey toggle.
//!
//! The controller is always in one of two modes:
//!
//! - **local**: keystrokes reach local applications and nothing is sent;
//! - **forwarding**: keystrokes are swallowed locally and sent to the target.
//!
//! [`ControlState`] holds both flags, and they are always equal.  The only
//! way to change them is [`ControlToggle::toggle`], which flips the flags and
//! then restarts the input hook with the matching suppression setting.
//!
//! # Threading
//!
//! `toggle` stops and reinstalls the hook, so it must never run on the hook
//! callback thread.  The callback calls
//! [`ControlToggle::restart_in_background`], which runs the toggle on a
//! short-lived worker thread.  Callbacks read the forwarding flag through a
//! lock-free mirror ([`ControlToggle::is_forwarding`]) so they never wait on
//! a restart in progress.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::infrastructure::input_capture::{CaptureError, CaptureHandler, InputHook};

/// Pause between stopping the hook and installing it again, giving the OS
/// time to drain in-flight events.
pub const DEFAULT_RESTART_PAUSE: Duration = Duration::from_millis(100);

/// The two process-wide flags that decide what happens to a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    /// Captured keys are sent to the target.
    pub forwarding_enabled: bool,
    /// The hook withholds keystrokes from local applications.
    pub local_suppression_active: bool,
}

impl ControlState {
    /// The state after one toggle.
    pub fn toggled(self) -> Self {
        let on = !self.forwarding_enabled;
        Self {
            forwarding_enabled: on,
            local_suppression_active: on,
        }
    }
}

/// Owns the [`ControlState`] and the input hook it configures.
pub struct ControlToggle {
    state: Mutex<ControlState>,
    forwarding: AtomicBool,
    hook: Arc<dyn InputHook>,
    restart_pause: Duration,
}

impl ControlToggle {
    /// Creates a toggle in local mode.  The hook is not installed until
    /// [`start`](Self::start) is called.
    pub fn new(hook: Arc<dyn InputHook>, restart_pause: Duration) -> Self {
        Self {
            state: Mutex::new(ControlState::default()),
            forwarding: AtomicBool::new(false),
            hook,
            restart_pause,
        }
    }

    /// Current state.  Blocks while a restart is in progress.
    pub fn state(&self) -> ControlState {
        *self.lock_state()
    }

    /// Lock-free read of `forwarding_enabled` for the capture callback path.
    pub fn is_forwarding(&self) -> bool {
        self.forwarding.load(Ordering::Acquire)
    }

    /// Installs the hook for the current state.
    ///
    /// # Errors
    ///
    /// Propagates the [`CaptureError`] returned by the hook.
    pub fn start(&self, handler: Arc<dyn CaptureHandler>) -> Result<(), CaptureError> {
        let state = self.lock_state();
        self.hook.install(state.local_suppression_active, handler)?;
        info!(
            forwarding = state.forwarding_enabled,
            "input hook installed"
        );
        Ok(())
    }

    /// Flips both flags and restarts the hook with the new suppression
    /// setting.  Returns the new state.
    ///
    /// The state mutex is held for the whole sequence, so concurrent toggles
    /// run one after another and each one observes the previous result.  The
    /// new state is published only after the hook is stopped, so no event is
    /// ever judged by one mode and suppressed by the other.
    ///
    /// # Errors
    ///
    /// Returns the hook's [`CaptureError`] if installing with the new setting
    /// fails.  The previous state is then restored and the hook is
    /// reinstalled with the previous setting, so the hotkey keeps working.
    pub fn toggle(&self, handler: Arc<dyn CaptureHandler>) -> Result<ControlState, CaptureError> {
        let mut state = self.lock_state();
        let previous = *state;
        let next = previous.toggled();

        self.hook.stop();
        self.publish(&mut state, next);
        debug!(pause_ms = self.restart_pause.as_millis() as u64, "input hook stopped");
        thread::sleep(self.restart_pause);

        if let Err(e) = self
            .hook
            .install(next.local_suppression_active, Arc::clone(&handler))
        {
            warn!("input hook rejected new mode, restoring previous one: {e}");
            self.publish(&mut state, previous);
            if let Err(restore) = self.hook.install(previous.local_suppression_active, handler) {
                error!("input hook could not be restored: {restore}");
            }
            return Err(e);
        }

        info!(
            forwarding = next.forwarding_enabled,
            suppression = next.local_suppression_active,
            "forwarding {}",
            if next.forwarding_enabled { "enabled" } else { "disabled" }
        );
        Ok(next)
    }

    /// Runs [`toggle`](Self::toggle) on a detached worker thread.
    ///
    /// This is the only form of the toggle that may be requested from inside
    /// a hook callback.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the worker thread cannot be spawned.
    pub fn restart_in_background(
        self: &Arc<Self>,
        handler: Arc<dyn CaptureHandler>,
    ) -> io::Result<JoinHandle<()>> {
        let toggle = Arc::clone(self);
        thread::Builder::new()
            .name("keybridge-toggle".to_string())
            .spawn(move || {
                if let Err(e) = toggle.toggle(handler) {
                    error!("failed to reinstall input hook: {e}");
                }
            })
    }

    /// Removes the hook for good.
    pub fn shutdown(&self) {
        let _state = self.lock_state();
        self.hook.stop();
        info!("input hook removed");
    }

    fn publish(&self, state: &mut ControlState, value: ControlState) {
        *state = value;
        self.forwarding
            .store(value.forwarding_enabled, Ordering::Release);
    }

    fn lock_state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::mock::MockInputHook;
    use crate::infrastructure::input_capture::CapturedEvent;
    use mockall::mock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{OnceLock, Weak};

    struct NullHandler;

    impl CaptureHandler for NullHandler {
        fn deliver(&self, _event: CapturedEvent) {}
    }

    mock! {
        Hook {}
        impl InputHook for Hook {
            fn install(&self, suppress: bool, handler: Arc<dyn CaptureHandler>) -> Result<(), CaptureError>;
            fn stop(&self);
        }
    }

    /// Records the forwarding mirror as seen from inside each hook call.
    #[derive(Default)]
    struct ObservingHook {
        toggle: OnceLock<Weak<ControlToggle>>,
        seen: Mutex<Vec<(&'static str, bool)>>,
    }

    impl ObservingHook {
        fn observe(&self, call: &'static str) {
            let forwarding = self
                .toggle
                .get()
                .and_then(Weak::upgrade)
                .is_some_and(|t| t.is_forwarding());
            self.seen.lock().unwrap().push((call, forwarding));
        }
    }

    impl InputHook for ObservingHook {
        fn install(&self, _suppress: bool, _handler: Arc<dyn CaptureHandler>) -> Result<(), CaptureError> {
            self.observe("install");
            Ok(())
        }

        fn stop(&self) {
            self.observe("stop");
        }
    }

    fn make_toggle() -> (Arc<ControlToggle>, Arc<MockInputHook>) {
        let hook = Arc::new(MockInputHook::new());
        let toggle = Arc::new(ControlToggle::new(hook.clone(), Duration::ZERO));
        (toggle, hook)
    }

    fn handler() -> Arc<dyn CaptureHandler> {
        Arc::new(NullHandler)
    }

    #[test]
    fn test_initial_state_is_local_mode() {
        let (toggle, _) = make_toggle();
        assert_eq!(toggle.state(), ControlState::default());
        assert!(!toggle.is_forwarding());
    }

    #[test]
    fn test_start_installs_hook_without_suppression() {
        let (toggle, hook) = make_toggle();

        toggle.start(handler()).expect("start");

        assert_eq!(hook.installs(), vec![false]);
    }

    #[test]
    fn test_toggle_enables_forwarding_and_suppression_together() {
        // Arrange
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();

        // Act
        let state = toggle.toggle(handler()).expect("toggle");

        // Assert
        assert!(state.forwarding_enabled);
        assert_eq!(state.forwarding_enabled, state.local_suppression_active);
        assert!(toggle.is_forwarding());
        assert_eq!(hook.installs(), vec![false, true]);
        assert_eq!(hook.stop_count(), 1);
    }

    #[test]
    fn test_toggle_twice_restores_original_state() {
        // Arrange
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();
        let original = toggle.state();

        // Act
        toggle.toggle(handler()).unwrap();
        let restored = toggle.toggle(handler()).unwrap();

        // Assert
        assert_eq!(restored, original);
        assert!(!toggle.is_forwarding());
        assert_eq!(hook.installs(), vec![false, true, false]);
    }

    #[test]
    fn test_reinstalls_alternate_suppression() {
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();

        for _ in 0..4 {
            let state = toggle.toggle(handler()).unwrap();
            assert_eq!(state.forwarding_enabled, state.local_suppression_active);
        }

        assert_eq!(hook.installs(), vec![false, true, false, true, false]);
    }

    #[test]
    fn test_restart_in_background_runs_toggle_on_worker_thread() {
        // Arrange
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();

        // Act
        let worker = toggle.restart_in_background(handler()).expect("spawn");
        worker.join().expect("worker must not panic");

        // Assert
        assert!(toggle.state().forwarding_enabled);
        assert_eq!(hook.installs(), vec![false, true]);
    }

    #[test]
    fn test_concurrent_toggles_are_serialized() {
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();

        let workers: Vec<_> = (0..6)
            .map(|_| toggle.restart_in_background(handler()).unwrap())
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // Six flips land back in local mode, and every install matched the
        // state it was made for.
        assert_eq!(toggle.state(), ControlState::default());
        assert_eq!(hook.installs(), vec![false, true, false, true, false, true, false]);
    }

    #[test]
    fn test_failed_install_restores_previous_mode() {
        // Arrange
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        let mut hook = MockHook::new();
        hook.expect_stop().times(1).return_const(());
        hook.expect_install().times(2).returning(move |suppress, _| {
            recorded.lock().unwrap().push(suppress);
            if suppress {
                Err(CaptureError::HookInstallFailed("access denied".into()))
            } else {
                Ok(())
            }
        });
        let toggle = ControlToggle::new(Arc::new(hook), Duration::ZERO);

        // Act
        let result = toggle.toggle(handler());

        // Assert
        assert!(matches!(result, Err(CaptureError::HookInstallFailed(_))));
        assert_eq!(*calls.lock().unwrap(), vec![true, false]);
        assert_eq!(toggle.state(), ControlState::default());
        assert!(!toggle.is_forwarding());
    }

    #[test]
    fn test_toggle_after_failed_install_can_enable_forwarding() {
        // Arrange
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mut hook = MockHook::new();
        hook.expect_stop().times(2).return_const(());
        hook.expect_install().times(3).returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CaptureError::HookInstallFailed("busy".into()))
            } else {
                Ok(())
            }
        });
        let toggle = ControlToggle::new(Arc::new(hook), Duration::ZERO);
        assert!(toggle.toggle(handler()).is_err());

        // Act
        let state = toggle.toggle(handler()).expect("second toggle");

        // Assert
        assert!(state.forwarding_enabled);
        assert!(toggle.is_forwarding());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_mirror_changes_only_while_hook_is_detached() {
        // Arrange
        let hook = Arc::new(ObservingHook::default());
        let toggle = Arc::new(ControlToggle::new(hook.clone(), Duration::ZERO));
        hook.toggle
            .set(Arc::downgrade(&toggle))
            .unwrap_or_else(|_| panic!("set once"));
        toggle.start(handler()).unwrap();

        // Act
        toggle.toggle(handler()).unwrap();
        toggle.toggle(handler()).unwrap();

        // Assert: (call, mirror seen by the hook)
        assert_eq!(
            *hook.seen.lock().unwrap(),
            vec![
                ("install", false),
                ("stop", false),
                ("install", true),
                ("stop", true),
                ("install", false),
            ]
        );
    }

    #[test]
    fn test_start_propagates_install_failure() {
        let mut hook = MockHook::new();
        hook.expect_install()
            .returning(|_, _| Err(CaptureError::UnsupportedPlatform("test".into())));
        let toggle = ControlToggle::new(Arc::new(hook), Duration::ZERO);

        assert!(toggle.start(handler()).is_err());
    }

    #[test]
    fn test_shutdown_stops_hook() {
        let (toggle, hook) = make_toggle();
        toggle.start(handler()).unwrap();

        toggle.shutdown();

        assert!(!hook.is_installed());
    }
}
