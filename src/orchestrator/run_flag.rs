//! Cooperative "reply in progress" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared between the running session and whoever may stop it.
///
/// Clones observe the same flag. The session checks it between stream
/// events; clearing it never interrupts a read already in flight.
#[derive(Debug, Clone, Default)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark a session as started. Returns `false` if one already was.
    pub fn start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Ask the running session to stop. Returns whether one was running.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
