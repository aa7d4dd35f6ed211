//! # Mailbox signaling between cores
//!
//! A mailbox is a small hardware FIFO per core pair. Writing a 32-bit word
//! into it raises an interrupt on the destination core; that word is the
//! *only* thing a mailbox carries. Payload data travels through shared
//! memory, the mailbox is the doorbell.
//!
//! * [`Mailbox`] is the hardware contract: send, read-and-acknowledge,
//!   gate the local interrupt.
//! * [`OmapMailbox`] drives the IPU mailbox block through MMIO.
//! * [`MailboxInterrupt`] owns the single handler invoked for every arriving
//!   payload.
//! * [`MailboxIrqGuard`] masks the local mailbox interrupt for a critical
//!   section and restores it on drop.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod core_id;
mod guard;
mod interrupt;
mod omap;
pub mod registers;

pub use core_id::CoreId;
pub use guard::MailboxIrqGuard;
pub use interrupt::{MailboxHandler, MailboxInterrupt};
pub use omap::OmapMailbox;

/// Hardware doorbell between this core and its peers.
///
/// None of these operations can fail. A destination FIFO that never drains
/// hangs [`send`](Mailbox::send); dropping the payload instead would corrupt
/// the protocol state on the peer.
pub trait Mailbox {
    /// Busy-waits while the destination FIFO is full, then writes `payload`.
    ///
    /// May be called from interrupt context.
    fn send(&self, destination: CoreId, payload: u32);

    /// Reads and acknowledges the pending payload of this core's mailbox.
    ///
    /// Returns `None` if the mailbox is empty, which is normal: the interrupt
    /// line is shared with mailboxes that belong to other cores.
    fn clear_and_read(&self) -> Option<u32>;

    /// Unmasks this core's mailbox interrupt. Queued messages are kept.
    fn enable(&self);

    /// Masks this core's mailbox interrupt. Queued messages are kept.
    fn disable(&self);

    /// Whether this core's mailbox interrupt is currently unmasked.
    fn is_enabled(&self) -> bool;
}

impl<M: Mailbox + ?Sized> Mailbox for &M {
    #[inline]
    fn send(&self, destination: CoreId, payload: u32) {
        (**self).send(destination, payload);
    }

    #[inline]
    fn clear_and_read(&self) -> Option<u32> {
        (**self).clear_and_read()
    }

    #[inline]
    fn enable(&self) {
        (**self).enable();
    }

    #[inline]
    fn disable(&self) {
        (**self).disable();
    }

    #[inline]
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}
