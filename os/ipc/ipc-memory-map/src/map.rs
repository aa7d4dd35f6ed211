//! Deployment memory map of the IPC carveout.
//!
//! ```text
//! SHARED_BASE
//! +0x0_0000  buffer space (2 x NUM_BUFFERS x BUFFER_SIZE)
//! +0x4_0000  ring 0  host -> core 0
//! +0x4_3000  ring 1  core 0 -> host
//!   ...
//! +0x9_0000  ring 2  host -> core 1
//! +0x9_3000  ring 3  core 1 -> host
//! ```
//!
//! These values are part of the wire protocol. Changing any of them requires
//! rebuilding every image that shares the carveout.

use crate::{PhysicalAddress, VirtualAddress};

pub const PAGE_SIZE: u64 = 4096;

/// Base of the carveout as seen by the firmware cores.
pub const SHARED_BASE: VirtualAddress = VirtualAddress::new(0xA000_0000);

/// Base of the carveout as written into descriptors.
pub const SHARED_BASE_PHYSICAL: PhysicalAddress = PhysicalAddress::new(0x9CF0_0000);

/// Size of the window in which [`SHARED_BASE`] and [`SHARED_BASE_PHYSICAL`] alias.
pub const ALIAS_WINDOW_SIZE: u64 = 0x10_0000;

/// Descriptors per ring.
pub const NUM_BUFFERS: u16 = 256;

/// Size of every message buffer; the ring only moves buffers of this size.
pub const BUFFER_SIZE: u32 = 512;

/// Both directions' buffer pools, placed in front of the rings.
pub const BUFFER_SPACE: u64 = NUM_BUFFERS as u64 * BUFFER_SIZE as u64 * 2;

/// Alignment between the producer and consumer halves of a ring.
pub const VRING_ALIGN: u64 = 4096;

/// Bytes reserved per ring: the ring footprint for [`NUM_BUFFERS`] entries
/// rounded up to whole pages (three pages for 256 entries).
pub const RING_SIZE: u64 = 3 * PAGE_SIZE;

/// Distance between the first and the second subordinate core's ring pair.
pub const SECOND_CORE_OFFSET: u64 = 0x5_0000;

/// Bytes the orchestrator zeroes before announcing readiness; covers both
/// ring pairs.
pub const SHARED_REGION_SIZE: u64 = SECOND_CORE_OFFSET + BUFFER_SPACE + 2 * RING_SIZE;

/// Number of ring directions laid out in the carveout.
pub const NUM_RINGS: u16 = 4;

/// Offset of the ring used by queue `id`, relative to [`SHARED_BASE`].
///
/// ```rust
/// # use ipc_memory_map::map::*;
/// assert_eq!(ring_offset(0), Some(0x4_0000));
/// assert_eq!(ring_offset(3), Some(0x9_3000));
/// assert_eq!(ring_offset(4), None);
/// ```
#[must_use]
pub const fn ring_offset(id: u16) -> Option<u64> {
    let pair = match id {
        0 | 1 => 0,
        2 | 3 => SECOND_CORE_OFFSET,
        _ => return None,
    };
    let within = if id % 2 == 0 { 0 } else { RING_SIZE };
    Some(BUFFER_SPACE + pair + within)
}

const _: () = assert!(BUFFER_SPACE == 0x4_0000);
const _: () = assert!(SHARED_REGION_SIZE <= ALIAS_WINDOW_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_do_not_overlap() {
        let mut offsets: Vec<u64> = (0..NUM_RINGS).filter_map(ring_offset).collect();
        offsets.sort_unstable();
        for pair in offsets.windows(2) {
            assert!(pair[1] - pair[0] >= RING_SIZE);
        }
        assert!(offsets.iter().all(|o| o + RING_SIZE <= SHARED_REGION_SIZE));
        assert!(offsets.iter().all(|o| o % VRING_ALIGN == 0));
    }

    #[test]
    fn rings_start_after_buffers() {
        assert_eq!(ring_offset(0), Some(BUFFER_SPACE));
        assert_eq!(ring_offset(1), Some(BUFFER_SPACE + RING_SIZE));
        assert_eq!(ring_offset(2), Some(BUFFER_SPACE + SECOND_CORE_OFFSET));
    }
}
