//! A scoped lock rejecting nested entry into an auction house.

use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use crate::error::{AuctionError, AuctionResult};

/// A flag that is set while a state-mutating operation runs.
#[derive(Debug, Default)]
pub struct NonReentrant {
    entered: AtomicBool,
}

/// Clears the [`NonReentrant`] flag when dropped, on success and failure
/// alike.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReentrancyGuard<'a> {
    entered: &'a AtomicBool,
}

impl NonReentrant {
    /// Creates an unlocked flag.
    pub const fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    /// Sets the flag, failing with [`AuctionError::Reentrancy`] if it is
    /// already set.
    pub fn enter(&self) -> AuctionResult<ReentrancyGuard<'_>> {
        match self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => Ok(ReentrancyGuard {
                entered: &self.entered,
            }),
            Err(_) => {
                warn!("Rejected a nested call into the auction house");
                Err(AuctionError::Reentrancy)
            }
        }
    }

    /// Whether an operation is currently running.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}
