//! # Shared-memory addresses and the IPC memory map
//!
//! Two cores exchange ring indices and buffer addresses through a carveout of
//! shared RAM. Each core sees that carveout at its own address, so every
//! address that crosses the boundary must be translated. This crate keeps the
//! two address spaces apart at the type level:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address as dereferenced by *this* core. |
//! | [`PhysicalAddress`] | An address as written into a ring descriptor, agreed by both cores. |
//!
//! Conversions between the two go through exactly one seam,
//! [`AddressTranslation`], so the protocol code never needs to know the
//! aliasing scheme of the memory controller.
//!
//! The deployment constants (where the rings live, how big they are) are in
//! [`map`]. Both peers are built against the same values; nothing here is
//! discovered at runtime.
//!
//! ```rust
//! # use ipc_memory_map::*;
//! let va = map::SHARED_BASE + 0x200;
//! let pa = IpuAlias.to_physical(va);
//! assert_eq!(pa.as_u64(), 0x9CF0_0200);
//! assert_eq!(IpuAlias.to_virtual(pa), va);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

pub mod map;
mod physical_address;
mod translation;
mod virtual_address;

pub use physical_address::PhysicalAddress;
pub use translation::{AddressTranslation, Identity, IpuAlias};
pub use virtual_address::VirtualAddress;

/// Rounds `value` up to the next multiple of `align` (a power of two).
///
/// ```rust
/// # use ipc_memory_map::align_up;
/// assert_eq!(align_up(4614, 4096), 8192);
/// assert_eq!(align_up(8192, 4096), 8192);
/// ```
#[inline]
#[must_use]
pub const fn align_up(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Whether `value` is a multiple of `align` (a power of two).
#[inline]
#[must_use]
pub const fn is_aligned(value: u64, align: u64) -> bool {
    value & (align - 1) == 0
}
