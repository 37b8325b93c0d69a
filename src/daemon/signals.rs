//! Signal handling: SIGTERM/SIGINT set a cooperative stop flag observed at
//! the top of the agent loop and during the inter-tick sleep.
//!
//! Uses the `signal-hook` crate for safe signal registration, following this
//! codebase's existing signal-handling pattern: the main loop polls a flag
//! each iteration rather than blocking on signals or running handler logic
//! inside the signal context.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "daemon")]
use signal_hook::consts::{SIGINT, SIGTERM};

/// Thread-safe stop flag shared between the signal handler and the agent
/// loop. `Ordering::Relaxed` is sufficient: the loop polls it every
/// iteration and exact ordering with other atomics isn't required.
#[derive(Clone)]
pub struct SignalHandler {
    stop_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register SIGINT/SIGTERM. Registration is
    /// best-effort; failures are logged to stderr but not fatal, since the
    /// agent can still be stopped by other means (e.g. a parent process
    /// killing it outright).
    #[cfg(feature = "daemon")]
    #[must_use]
    pub fn new() -> Self {
        let handler = Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
        };
        handler.register_signals();
        handler
    }

    /// Signal registration unavailable without the `daemon` feature; the
    /// stop flag still exists and can be set programmatically.
    #[cfg(not(feature = "daemon"))]
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clone of the underlying flag, for passing to the interruptible sleep.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Check whether a shutdown has been requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    #[cfg(feature = "daemon")]
    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.stop_flag)) {
            eprintln!("[AEG-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.stop_flag)) {
            eprintln!("[AEG-SIGNAL] failed to register SIGINT: {e}");
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
