//! # Single-Flight Operation Lock
//!
//! The reader accepts one logical operation at a time; concurrent writers
//! would corrupt the cached parameter snapshot or race the inventory
//! toggle. This lock serializes the exclusive operations — parameter
//! writes, flash persists, inventory start — without blocking or queueing:
//! a losing caller fails fast with `busy`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking exclusivity flag with guard-based release.
#[derive(Debug, Default)]
pub(crate) struct OpLock {
    held: AtomicBool,
}

impl OpLock {
    /// Try to take the lock. Returns `None` if another operation holds it.
    pub fn try_acquire(&self) -> Option<OpGuard<'_>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(OpGuard { lock: self })
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the lock when dropped, on every exit path.
pub(crate) struct OpGuard<'a> {
    lock: &'a OpLock,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
