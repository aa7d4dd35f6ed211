use crate::VringLayout;
use bitfield_struct::bitfield;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU16, Ordering};
use ipc_memory_map::{PhysicalAddress, VirtualAddress};

/// One entry of the descriptor table.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Descriptor {
    pub addr: PhysicalAddress,
    pub len: u32,
    pub flags: u16,
    pub next: u16,
}

/// One entry of the used ring.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UsedElem {
    /// Index of the descriptor that was consumed.
    pub id: u32,
    /// Bytes the consumer wrote (or accepted) into that buffer.
    pub len: u32,
}

/// Flags word of the available ring; written by the producer only.
#[bitfield(u16)]
pub struct AvailFlags {
    /// Bit 0 — the producer does not want to be interrupted when buffers are used.
    pub no_interrupt: bool,

    /// Bits 1–15 — Reserved.
    #[bits(15, default = 0)]
    _reserved_1_15: u16,
}

/// Flags word of the used ring; written by the consumer only.
#[bitfield(u16)]
pub struct UsedFlags {
    /// Bit 0 — the consumer does not want to be kicked when buffers are added.
    pub no_notify: bool,

    /// Bits 1–15 — Reserved.
    #[bits(15, default = 0)]
    _reserved_1_15: u16,
}

/// A typed view of one ring in shared memory.
///
/// All accesses are volatile (descriptor and ring entries) or atomic (flags
/// and indices). Index stores use release ordering and index loads use
/// acquire ordering, so entries written before an index is published are
/// visible to a peer that has observed that index.
///
/// The view itself does not enforce who writes what; [`VirtQueue`](crate::VirtQueue)
/// does, based on its role. Several views of the same memory may exist, one
/// per core.
pub struct RingStore<'m> {
    base: NonNull<u8>,
    layout: VringLayout,
    _memory: PhantomData<&'m [u8]>,
}

// Safety: the shared memory is only ever accessed through volatile/atomic operations.
unsafe impl Send for RingStore<'_> {}
unsafe impl Sync for RingStore<'_> {}

impl<'m> RingStore<'m> {
    /// Lays a ring of `capacity` entries with alignment `align` over `base`.
    ///
    /// Memory is not touched; the ring is expected to have been zeroed once by
    /// whoever owns the carveout.
    ///
    /// # Safety
    /// `base` must be valid for reads and writes of
    /// [`VringLayout::footprint`] bytes for `'m`, and may only be written by
    /// parties following the ring protocol.
    ///
    /// # Panics
    /// If `base` is not aligned to `align` and to the 16-byte descriptor size
    /// (a hard precondition, not a recoverable error).
    #[must_use]
    pub unsafe fn init(capacity: u16, base: NonNull<u8>, align: u64) -> Self {
        unsafe { Self::with_layout(base, VringLayout::new(capacity, align)) }
    }

    /// Like [`init`](Self::init), with a precomputed layout.
    ///
    /// # Safety
    /// See [`init`](Self::init).
    #[must_use]
    pub unsafe fn with_layout(base: NonNull<u8>, layout: VringLayout) -> Self {
        let va = VirtualAddress::from_nonnull(base);
        assert!(
            va.is_aligned(layout.align()) && va.is_aligned(16),
            "ring base {va:?} not aligned to {:#x}",
            layout.align()
        );
        Self {
            base,
            layout,
            _memory: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &VringLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u16 {
        self.layout.capacity()
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> VirtualAddress {
        VirtualAddress::from_nonnull(self.base)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn at<T>(&self, offset: u64) -> *mut T {
        debug_assert!(offset + size_of::<T>() as u64 <= self.layout.size());
        // SAFETY: offsets come from the layout, which lies within the ring.
        unsafe { self.base.as_ptr().add(offset as usize).cast() }
    }

    #[inline]
    fn atomic(&self, offset: u64) -> &AtomicU16 {
        // SAFETY: layout offsets of flags/indices are 2-byte aligned and only accessed atomically.
        unsafe { AtomicU16::from_ptr(self.at(offset)) }
    }

    pub fn write_descriptor(&self, slot: u16, desc: Descriptor) {
        debug_assert!(slot < self.capacity());
        let off = self.layout.descriptor_offset(slot);
        unsafe {
            self.at::<u64>(off).write_volatile(desc.addr.as_u64());
            self.at::<u32>(off + 8).write_volatile(desc.len);
            self.at::<u16>(off + 12).write_volatile(desc.flags);
            self.at::<u16>(off + 14).write_volatile(desc.next);
        }
    }

    #[must_use]
    pub fn read_descriptor(&self, slot: u16) -> Descriptor {
        debug_assert!(slot < self.capacity());
        let off = self.layout.descriptor_offset(slot);
        unsafe {
            Descriptor {
                addr: PhysicalAddress::new(self.at::<u64>(off).read_volatile()),
                len: self.at::<u32>(off + 8).read_volatile(),
                flags: self.at::<u16>(off + 12).read_volatile(),
                next: self.at::<u16>(off + 14).read_volatile(),
            }
        }
    }

    #[must_use]
    pub fn avail_flags(&self) -> AvailFlags {
        AvailFlags::from_bits(self.atomic(self.layout.avail_offset()).load(Ordering::Acquire))
    }

    pub fn set_avail_flags(&self, flags: AvailFlags) {
        self.atomic(self.layout.avail_offset())
            .store(flags.into_bits(), Ordering::Release);
    }

    /// The producer's published index (acquire).
    #[must_use]
    pub fn avail_idx(&self) -> u16 {
        self.atomic(self.layout.avail_idx_offset()).load(Ordering::Acquire)
    }

    /// Publishes the producer's index (release).
    pub fn publish_avail_idx(&self, idx: u16) {
        self.atomic(self.layout.avail_idx_offset())
            .store(idx, Ordering::Release);
    }

    pub fn write_avail_entry(&self, slot: u16, head: u16) {
        debug_assert!(slot < self.capacity());
        unsafe { self.at::<u16>(self.layout.avail_entry_offset(slot)).write_volatile(head) }
    }

    #[must_use]
    pub fn used_flags(&self) -> UsedFlags {
        UsedFlags::from_bits(self.atomic(self.layout.used_offset()).load(Ordering::Acquire))
    }

    pub fn set_used_flags(&self, flags: UsedFlags) {
        self.atomic(self.layout.used_offset())
            .store(flags.into_bits(), Ordering::Release);
    }

    /// The consumer's published index (acquire).
    #[must_use]
    pub fn used_idx(&self) -> u16 {
        self.atomic(self.layout.used_idx_offset()).load(Ordering::Acquire)
    }

    /// Publishes the consumer's index (release).
    pub fn publish_used_idx(&self, idx: u16) {
        self.atomic(self.layout.used_idx_offset())
            .store(idx, Ordering::Release);
    }

    pub fn write_used_entry(&self, slot: u16, elem: UsedElem) {
        debug_assert!(slot < self.capacity());
        let off = self.layout.used_entry_offset(slot);
        unsafe {
            self.at::<u32>(off).write_volatile(elem.id);
            self.at::<u32>(off + 4).write_volatile(elem.len);
        }
    }

    #[must_use]
    pub fn read_used_entry(&self, slot: u16) -> UsedElem {
        debug_assert!(slot < self.capacity());
        let off = self.layout.used_entry_offset(slot);
        unsafe {
            UsedElem {
                id: self.at::<u32>(off).read_volatile(),
                len: self.at::<u32>(off + 4).read_volatile(),
            }
        }
    }
}
