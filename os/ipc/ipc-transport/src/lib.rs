//! # Inter-core transport
//!
//! Ties the pieces together for one core: the mailbox interrupt, the
//! bring-up handshake, and a fixed registry of virtqueues.
//!
//! ## Bring-up
//!
//! One core (the *orchestrator*) owns the shared carveout. It zeroes it and
//! then sends two messages to every *subordinate*: the `READY` tag and the
//! carveout's base address. A subordinate's [`Transport::startup`] returns
//! once both have arrived:
//!
//! ```text
//! WaitingForReady ──READY──► WaitingForBaseAddress ──any payload──► Ready
//! ```
//!
//! The announced address is recorded but never used for ring placement; the
//! carveout is at a fixed address on both sides.
//!
//! ## Dispatch
//!
//! Every mailbox payload goes through [`Transport::dispatch`]:
//!
//! 1. values in the reserved range are [`ControlMessage`]s,
//! 2. before `Ready`, anything else belongs to the handshake,
//! 3. after that, it is the id of the queue the peer kicked.
//!
//! ## Queues
//!
//! [`Transport::create_queue`] places a queue from the two cores involved
//! and a direction, and decides which half of the ring this core owns.
//! Producers [`send`](Transport::send) and [`reclaim`](Transport::reclaim),
//! consumers [`receive`](Transport::receive) and
//! [`complete`](Transport::complete).

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bootstrap;
pub mod control;
mod error;
mod registry;
mod transport;

pub use bootstrap::{BootRole, BootState, Bootstrap};
pub use control::ControlMessage;
pub use error::{BootstrapError, RegistryError, TransportError};
pub use registry::{NUM_QUEUES, QueueCallback, QueueSlot, Registry};
pub use transport::{ANNOUNCED_BASE, QueueHandle, Transport, TransportConfig, queue_placement};
