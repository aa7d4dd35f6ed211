use crate::registers::{
    self, FifoStatus, IRQ_ENABLE_CLEAR_M3, IRQ_ENABLE_SET_M3, IRQ_STATUS_CLEAR_M3, IrqMask,
    MessageStatus, assignment,
};
use crate::{CoreId, Mailbox};
use core::ptr::NonNull;
use ipc_sync::{Wait, spin_until};
use log::trace;

/// MMIO driver for the IPU mailbox block, as used by one of the M3 cores.
///
/// Every register access is a single volatile 32-bit load or store, so the
/// driver can be shared between task and interrupt context without locking.
pub struct OmapMailbox {
    base: NonNull<u8>,
    local: CoreId,
    inbound: u8,
}

// Safety: all accesses are single volatile word accesses to device registers.
unsafe impl Send for OmapMailbox {}
unsafe impl Sync for OmapMailbox {}

impl OmapMailbox {
    /// Creates the driver for `local` with the register block at `base`.
    ///
    /// Returns `None` if `local` has no inbound mailbox on this block.
    ///
    /// # Safety
    /// `base` must point at [`registers::MAILBOX_WINDOW`] bytes of mailbox
    /// registers (or memory standing in for them) for the lifetime of the
    /// driver.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>, local: CoreId) -> Option<Self> {
        let inbound = match local {
            CoreId::Core0 => assignment::CORE0,
            CoreId::Core1 => assignment::CORE1,
            CoreId::Host | CoreId::Dsp => return None,
        };
        Some(Self {
            base,
            local,
            inbound,
        })
    }

    /// The driver at the fixed IPU address.
    ///
    /// # Safety
    /// Only valid on an IPU core with the mailbox block mapped at
    /// [`registers::MAILBOX_BASE`].
    #[must_use]
    pub unsafe fn ipu(local: CoreId) -> Option<Self> {
        let base = NonNull::new(core::ptr::with_exposed_provenance_mut(registers::MAILBOX_BASE))?;
        unsafe { Self::new(base, local) }
    }

    #[must_use]
    pub const fn local(&self) -> CoreId {
        self.local
    }

    /// The mailbox carrying traffic from this core to `destination`.
    #[must_use]
    pub const fn outbound(&self, destination: CoreId) -> u8 {
        match destination {
            CoreId::Core0 => assignment::CORE0,
            CoreId::Core1 => assignment::CORE1,
            CoreId::Dsp => assignment::DSP,
            CoreId::Host => match self.local {
                CoreId::Core1 => assignment::HOST_FROM_CORE1,
                _ => assignment::HOST_FROM_CORE0,
            },
        }
    }

    #[inline]
    fn read(&self, offset: usize) -> u32 {
        debug_assert!(offset < registers::MAILBOX_WINDOW);
        unsafe { self.base.add(offset).cast::<u32>().read_volatile() }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        debug_assert!(offset < registers::MAILBOX_WINDOW);
        unsafe { self.base.add(offset).cast::<u32>().write_volatile(value) }
    }

    #[inline]
    fn inbound_mask(&self) -> IrqMask {
        IrqMask::new_message(self.inbound)
    }
}

impl Mailbox for OmapMailbox {
    fn send(&self, destination: CoreId, payload: u32) {
        let m = self.outbound(destination);
        trace!("mailbox {m}: sending {payload:#010x} to {destination}");

        spin_until(Wait::Forever, || {
            !FifoStatus::from_bits(self.read(registers::fifo_status(m))).full()
        });
        self.write(registers::message(m), payload);
    }

    fn clear_and_read(&self) -> Option<u32> {
        let m = self.inbound;
        let status = MessageStatus::from_bits(self.read(registers::message_status(m)));
        if !status.has_message() {
            return None;
        }

        let payload = self.read(registers::message(m));
        self.write(IRQ_STATUS_CLEAR_M3, self.inbound_mask().into_bits());
        Some(payload)
    }

    fn enable(&self) {
        self.write(IRQ_ENABLE_SET_M3, self.inbound_mask().into_bits());
    }

    fn disable(&self) {
        self.write(IRQ_ENABLE_CLEAR_M3, self.inbound_mask().into_bits());
    }

    fn is_enabled(&self) -> bool {
        IrqMask::from_bits(self.read(IRQ_ENABLE_SET_M3)).contains(self.inbound_mask())
    }
}
