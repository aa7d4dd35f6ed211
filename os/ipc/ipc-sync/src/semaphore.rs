use crate::{Wait, spin_until};
use core::sync::atomic::{AtomicU32, Ordering};

/// A counting semaphore.
///
/// [`post`](Semaphore::post) never blocks and may be called from an interrupt
/// handler; [`pend`](Semaphore::pend) spins until a count is available and is
/// meant for task context only.
pub struct Semaphore {
    count: AtomicU32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SemaphoreError {
    #[error("timed out waiting for the semaphore")]
    Timeout,
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Semaphore {
    #[must_use]
    pub const fn new(initial: u32) -> Self {
        Self {
            count: AtomicU32::new(initial),
        }
    }

    /// Releases one waiter (or banks the count if nobody is waiting yet).
    #[inline]
    pub fn post(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Takes one count without waiting.
    #[inline]
    pub fn try_pend(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(seen) => current = seen,
            }
        }
        false
    }

    /// Takes one count, spinning for at most `wait`.
    ///
    /// # Errors
    /// [`SemaphoreError::Timeout`] if no count became available in time.
    pub fn pend(&self, wait: Wait) -> Result<(), SemaphoreError> {
        if spin_until(wait, || self.try_pend()) {
            Ok(())
        } else {
            Err(SemaphoreError::Timeout)
        }
    }

    /// The number of banked posts.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}
