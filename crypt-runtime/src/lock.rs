//! Re-entrancy lock.
//!
//! A second `try_enter` while a guard is alive fails with `Reentrancy`.
//!
//! The lock is released when the returned guard drops, so every exit path
//! (including `?` early returns) unlocks.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CryptError, CryptResult};

#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: AtomicBool,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock or fail with `Reentrancy` if a call is already in flight.
    pub fn try_enter(&self) -> CryptResult<LockGuard<'_>> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(CryptError::Reentrancy);
        }
        Ok(LockGuard { lock: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.store(false, Ordering::Release);
    }
}
