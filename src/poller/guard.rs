use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide single-flight flag for poll cycles.
#[derive(Debug, Clone, Default)]
pub struct CycleGuard {
    active: Arc<AtomicBool>,
}

/// Held for the duration of one cycle; clears the guard when dropped,
/// including during unwinding.
#[derive(Debug)]
pub struct CyclePermit {
    active: Arc<AtomicBool>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a cycle is already running.
    pub fn try_acquire(&self) -> Option<CyclePermit> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit {
                active: Arc::clone(&self.active),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
