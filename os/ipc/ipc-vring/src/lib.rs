//! # Shared-memory virtqueues
//!
//! A virtqueue moves fixed-size buffers between two cores through a ring in
//! shared memory. The ring is split in two halves with exactly one writer
//! each:
//!
//! ```text
//! producer                                consumer
//!   add_available ──► descriptor table ──► get_available
//!                     available ring
//!   get_used      ◄── used ring        ◄── add_used
//! ```
//!
//! The producer owns the descriptor table and the available ring; the
//! consumer owns the used ring. Each side only reads the half it does not own,
//! so no locks are needed, only release/acquire ordering at the point where a
//! ring index is published and observed.
//!
//! * [`VringLayout`] computes where each part lives for a given capacity and
//!   alignment, once, as plain offsets.
//! * [`RingStore`] is a typed view of one ring in shared memory.
//! * [`SharedRegion`] is the whole carveout and hands out ring views at the
//!   fixed offsets of the memory map.
//! * [`VirtQueue`] is the protocol engine on top of one ring.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod error;
mod layout;
mod region;
mod ring;
mod virtqueue;

pub use error::VirtQueueError;
pub use layout::VringLayout;
pub use region::SharedRegion;
pub use ring::{AvailFlags, Descriptor, RingStore, UsedElem, UsedFlags};
pub use virtqueue::{AvailableBuffer, QueueId, QueueRole, UsedBuffer, VirtQueue};

/// The ring layout of the deployment memory map.
pub const IPC_LAYOUT: VringLayout =
    VringLayout::new(ipc_memory_map::map::NUM_BUFFERS, ipc_memory_map::map::VRING_ALIGN);

const _: () = assert!(
    IPC_LAYOUT.footprint() == ipc_memory_map::map::RING_SIZE,
    "RING_SIZE out of sync with the ring layout"
);
