use crate::{RingStore, VringLayout};
use core::marker::PhantomData;
use core::ptr::NonNull;
use ipc_memory_map::{VirtualAddress, map};
use log::debug;

/// The shared IPC carveout as mapped on this core.
///
/// Hands out [`RingStore`] views at fixed offsets. The region is
/// authoritative for ring placement: a base address announced by a peer at
/// runtime never moves it.
#[derive(Debug)]
pub struct SharedRegion<'m> {
    base: NonNull<u8>,
    len: u64,
    _memory: PhantomData<&'m [u8]>,
}

// Safety: see `RingStore`; the region only hands out volatile/atomic views.
unsafe impl Send for SharedRegion<'_> {}
unsafe impl Sync for SharedRegion<'_> {}

impl<'m> SharedRegion<'m> {
    /// # Safety
    /// `base` must be valid for reads and writes of `len` bytes for `'m`, and
    /// only accessed by parties following the ring protocol.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>, len: u64) -> Self {
        Self {
            base,
            len,
            _memory: PhantomData,
        }
    }

    /// The carveout at [`map::SHARED_BASE`].
    ///
    /// # Safety
    /// Only valid on a core that has the carveout mapped at its fixed address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn ipc() -> Self {
        let base = map::SHARED_BASE.as_mut_ptr::<u8>();
        let Some(base) = NonNull::new(base) else {
            unreachable!("the carveout base is non-zero");
        };
        unsafe { Self::new(base, map::SHARED_REGION_SIZE) }
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> VirtualAddress {
        VirtualAddress::from_nonnull(self.base)
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Zeroes the entire region.
    ///
    /// Done exactly once, by the orchestrating core, before either side looks
    /// at a ring index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn zero(&self) {
        debug!("zeroing {} bytes of shared memory at {}", self.len, self.base());
        // SAFETY: the region is valid for `len` bytes; no peer is using it yet.
        unsafe { self.base.as_ptr().write_bytes(0, self.len as usize) }
    }

    /// A view of the ring at `offset` with `layout`.
    ///
    /// # Panics
    /// If the ring does not fit into the region.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn ring(&self, offset: u64, layout: VringLayout) -> RingStore<'m> {
        assert!(
            offset + layout.footprint() <= self.len,
            "ring at +{offset:#x} ({:#x} bytes) exceeds the {:#x}-byte region",
            layout.footprint(),
            self.len
        );
        // SAFETY: in bounds (checked above) and valid for 'm per `new`.
        unsafe {
            let base = self.base.add(offset as usize);
            RingStore::with_layout(base, layout)
        }
    }

    /// The ring of queue `id` at its memory-map offset, or `None` if the map
    /// has no ring for that id.
    #[must_use]
    pub fn ring_for_queue(&self, id: u16, layout: VringLayout) -> Option<RingStore<'m>> {
        let offset = map::ring_offset(id)?;
        debug!("vring {id}: {} (+{offset:#x})", self.base() + offset);
        Some(self.ring(offset, layout))
    }
}
