//! One-shot startup guard.
//!
//! Stops a second startup sequence from running inside the same process.
//! It is not a cross-process lock.

use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Held while startup runs. Dropping it without [`InitGuard::commit`]
/// releases the flag so a later attempt may start again.
#[derive(Debug)]
pub struct InitGuard {
    flag: &'static AtomicBool,
    committed: bool,
}

impl InitGuard {
    /// Claim the process-wide startup flag.
    pub fn acquire() -> Option<Self> {
        Self::acquire_on(&INITIALIZED)
    }

    fn acquire_on(flag: &'static AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag,
                committed: false,
            })
    }

    /// Startup succeeded; keep the flag set for the rest of the process.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        if !self.committed {
            self.flag.store(false, Ordering::Release);
        }
    }
}
