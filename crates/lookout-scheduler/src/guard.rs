//! Single-flight guard for scan runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that at most one [`RunPermit`] can hold at a time.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit, or `None` when a run is already in flight.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of holding the guard. Dropping it (including while unwinding)
/// clears the flag.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = RunGuard::new();
        let other = guard.clone();
        let _permit = guard.try_acquire().expect("acquire");
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = RunGuard::new();
        let inner = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = inner.try_acquire().expect("acquire");
            panic!("scan blew up");
        });

        assert!(result.is_err());
        assert!(!guard.is_running());
    }
}
