//! Operator interrupt handling.
//!
//! Ctrl-C while idle (e.g. at the prefix prompt) runs the exit hook and
//! exits immediately. Ctrl-C while an iteration is running only requests
//! cancellation; the iteration winds down, the camera is released, and the
//! caller's loop exits.

use crate::camera::CancelToken;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type ExitHook = Arc<dyn Fn() + Send + Sync>;

/// What a received signal should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Nothing is holding the camera; exit now.
    Exit,
    /// An iteration is running; it will stop at the next opportunity.
    Deferred,
}

/// Shared interrupt state between the signal handler and the main loop.
#[derive(Clone, Default)]
pub struct Interrupt {
    token: CancelToken,
    busy: Arc<AtomicBool>,
    on_exit: Option<ExitHook>,
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("token", &self.token)
            .field("busy", &self.busy)
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

impl Interrupt {
    /// Creates idle state with no exit hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` before an idle interrupt terminates the process.
    pub fn on_exit(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Arc::new(hook));
        self
    }

    /// Installs this state as the process Ctrl-C handler.
    pub fn install(self) -> Result<Self, ctrlc::Error> {
        let handler = self.clone();
        ctrlc::set_handler(move || {
            if handler.on_signal() == SignalAction::Exit {
                eprintln!("\nExiting...");
                std::process::exit(130);
            }
        })?;
        Ok(self)
    }

    /// Records a signal and decides what to do with it. The exit hook has
    /// already run when this returns [`SignalAction::Exit`].
    pub fn on_signal(&self) -> SignalAction {
        self.token.cancel();
        if self.busy.load(Ordering::SeqCst) {
            tracing::warn!("interrupt received; finishing current session before exit");
            return SignalAction::Deferred;
        }
        if let Some(hook) = &self.on_exit {
            hook();
        }
        SignalAction::Exit
    }

    /// Token observed by the capture loop and the camera backend.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// True once a signal has been received.
    pub fn requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Marks an iteration as running until the guard is dropped.
    pub fn begin(&self) -> BusyGuard {
        self.busy.store(true, Ordering::SeqCst);
        BusyGuard {
            busy: Arc::clone(&self.busy),
        }
    }
}

/// Clears the busy flag on drop.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
