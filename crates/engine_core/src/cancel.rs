//! Cooperative cancellation for self-rescheduling frame loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared running flag checked at the top of every scheduled frame.
///
/// Cancelling is cooperative: whoever polls the token stops at its next
/// check, so a loop observes cancellation with at most one frame of latency.
#[derive(Debug, Clone)]
pub struct RunToken {
    running: Arc<AtomicBool>,
}

impl Default for RunToken {
    fn default() -> Self {
        Self::new()
    }
}

impl RunToken {
    /// Create a token in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Request that every holder of this token stops.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True when both tokens share the same flag.
    pub fn same_as(&self, other: &RunToken) -> bool {
        Arc::ptr_eq(&self.running, &other.running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = RunToken::new();
        let clone = token.clone();
        assert!(clone.is_running());
        token.cancel();
        assert!(!clone.is_running());
        assert!(token.same_as(&clone));
    }

    #[test]
    fn independent_tokens_are_distinct() {
        let a = RunToken::new();
        let b = RunToken::new();
        assert!(!a.same_as(&b));
        a.cancel();
        assert!(b.is_running());
    }
}
