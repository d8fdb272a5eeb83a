//! Cooperative cancellation for waiters parked on the capacity condition.
//!
//! Rust has no safe analogue of Java's `Thread.interrupt()` reaching into a
//! blocked `Condvar::wait`. A [`CancelToken`] is the explicit, idiomatic
//! stand-in: a blocked `request_*_cancellable` call polls it between
//! bounded `wait_timeout` slices and raises `PoolError::Interrupted` the
//! first time it observes the token cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable, cancellable handle for a single logical request.
///
/// Cloning shares the same underlying flag — cancel any clone and every
/// clone observes it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this token (and every clone of it) as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
