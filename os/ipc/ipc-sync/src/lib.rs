//! # Synchronization primitives for the inter-core transport
//!
//! Everything here spins; there is no scheduler underneath to yield to. The
//! primitives are safe to use from interrupt context as long as the waiting
//! side is not the same context that is expected to make progress.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod semaphore;
mod spin_lock;
mod sync_once_cell;
mod wait;

pub use semaphore::{Semaphore, SemaphoreError};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
pub use wait::{Wait, spin_until};
