use ipc_memory_map::align_up;

const DESCRIPTOR_SIZE: u64 = 16;
const RING_HEADER: u64 = 4;
const RING_TRAILER: u64 = 2;
const AVAIL_ENTRY: u64 = 2;
const USED_ENTRY: u64 = 8;

/// Where the parts of a ring live, relative to the ring base.
///
/// ```text
/// +0            descriptor table   capacity x {addr u64, len u32, flags u16, next u16}
/// +avail        available ring     flags u16, idx u16, ring[capacity] u16, used_event u16
/// +used         used ring          flags u16, idx u16, ring[capacity] {id u32, len u32}, avail_event u16
///               (used is aligned up to `align`)
/// ```
///
/// Both cores compute the same offsets from the same constants, so no pointer
/// ever has to be exchanged.
///
/// ```rust
/// # use ipc_vring::VringLayout;
/// let layout = VringLayout::new(256, 4096);
/// assert_eq!(layout.avail_offset(), 0x1000);
/// assert_eq!(layout.used_offset(), 0x2000);
/// assert_eq!(layout.size(), 0x2806);
/// assert_eq!(layout.footprint(), 0x3000);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VringLayout {
    capacity: u16,
    align: u64,
    avail: u64,
    used: u64,
    size: u64,
}

impl VringLayout {
    /// # Panics
    /// If `capacity` or `align` is not a non-zero power of two. Ring indices
    /// are free-running `u16`s reduced modulo the capacity, which only stays
    /// consistent across their wraparound for powers of two.
    #[must_use]
    pub const fn new(capacity: u16, align: u64) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        assert!(align.is_power_of_two(), "ring alignment must be a power of two");

        let n = capacity as u64;
        let avail = DESCRIPTOR_SIZE * n;
        let used = align_up(avail + RING_HEADER + AVAIL_ENTRY * n + RING_TRAILER, align);
        let size = used + RING_HEADER + USED_ENTRY * n + RING_TRAILER;

        Self {
            capacity,
            align,
            avail,
            used,
            size,
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u16 {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub const fn align(&self) -> u64 {
        self.align
    }

    /// Exact number of bytes the ring occupies.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// [`size`](Self::size) rounded up to the alignment boundary; the space
    /// reserved for the ring in the memory map.
    #[inline]
    #[must_use]
    pub const fn footprint(&self) -> u64 {
        align_up(self.size, self.align)
    }

    #[inline]
    #[must_use]
    pub const fn descriptor_offset(&self, slot: u16) -> u64 {
        DESCRIPTOR_SIZE * slot as u64
    }

    #[inline]
    #[must_use]
    pub const fn avail_offset(&self) -> u64 {
        self.avail
    }

    #[inline]
    #[must_use]
    pub const fn avail_idx_offset(&self) -> u64 {
        self.avail + 2
    }

    #[inline]
    #[must_use]
    pub const fn avail_entry_offset(&self, slot: u16) -> u64 {
        self.avail + RING_HEADER + AVAIL_ENTRY * slot as u64
    }

    #[inline]
    #[must_use]
    pub const fn used_offset(&self) -> u64 {
        self.used
    }

    #[inline]
    #[must_use]
    pub const fn used_idx_offset(&self) -> u64 {
        self.used + 2
    }

    #[inline]
    #[must_use]
    pub const fn used_entry_offset(&self, slot: u16) -> u64 {
        self.used + RING_HEADER + USED_ENTRY * slot as u64
    }

    /// Ring slot for a free-running index.
    #[inline]
    #[must_use]
    pub const fn slot(&self, index: u16) -> u16 {
        index & (self.capacity - 1)
    }
}
