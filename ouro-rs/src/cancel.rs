//! Cooperative cancellation.
//!
//! A [`CancelToken`] is the "is running" flag polled at every iteration step
//! of every Definition, filter, comparison loop and command loop.  Clones
//! share the same flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CancelToken {
    running: Arc<AtomicBool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken { running: Arc::new(AtomicBool::new(true)) }
    }

    /// Clear the running flag.  Every iteration that polls afterwards unwinds.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        !self.is_running()
    }

    /// Set the flag back to running before a new script run.
    pub fn reset(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(b.is_running());
        a.cancel();
        assert!(b.is_cancelled());
        b.reset();
        assert!(a.is_running());
    }
}
