//! Register model of the IPU mailbox block.
//!
//! Offsets are relative to [`MAILBOX_BASE`]. Per-mailbox registers are
//! arrays with a stride of four bytes; the IRQ registers carry two bits per
//! mailbox (new message, not full) for the M3 user.

use bitfield_struct::bitfield;

/// Base of the mailbox block in the IPU address map.
pub const MAILBOX_BASE: usize = 0xAA0F_4000;

/// Size of the register window this driver touches.
pub const MAILBOX_WINDOW: usize = 0x130;

pub const MESSAGE: usize = 0x040;
pub const FIFO_STATUS: usize = 0x080;
pub const MESSAGE_STATUS: usize = 0x0C0;
pub const IRQ_STATUS_CLEAR_M3: usize = 0x124;
pub const IRQ_ENABLE_SET_M3: usize = 0x128;
pub const IRQ_ENABLE_CLEAR_M3: usize = 0x12C;

/// Mailbox indices as wired on the IPU.
pub mod assignment {
    /// Inbound to core 0.
    pub const CORE0: u8 = 0;
    /// Core 0 to the host.
    pub const HOST_FROM_CORE0: u8 = 1;
    /// Core 1 to the host.
    pub const HOST_FROM_CORE1: u8 = 2;
    /// Inbound to core 1.
    pub const CORE1: u8 = 3;
    /// Inbound to the DSP.
    pub const DSP: u8 = 4;
}

/// Offset of the message register of mailbox `m`.
#[must_use]
pub const fn message(m: u8) -> usize {
    MESSAGE + 4 * m as usize
}

/// Offset of the FIFO status register of mailbox `m`.
#[must_use]
pub const fn fifo_status(m: u8) -> usize {
    FIFO_STATUS + 4 * m as usize
}

/// Offset of the message status register of mailbox `m`.
#[must_use]
pub const fn message_status(m: u8) -> usize {
    MESSAGE_STATUS + 4 * m as usize
}

/// `MAILBOX_FIFOSTATUS_m`.
#[bitfield(u32)]
pub struct FifoStatus {
    /// Bit 0 — the FIFO cannot take another message.
    pub full: bool,

    /// Bits 1–31 — Reserved.
    #[bits(31, default = 0)]
    _reserved_1_31: u32,
}

/// `MAILBOX_MSGSTATUS_m`.
#[bitfield(u32)]
pub struct MessageStatus {
    /// Bits 0–2 — number of messages queued in the FIFO.
    #[bits(3)]
    pub pending: u8,

    /// Bits 3–31 — Reserved.
    #[bits(29, default = 0)]
    _reserved_3_31: u32,
}

impl MessageStatus {
    #[must_use]
    pub const fn has_message(&self) -> bool {
        self.pending() != 0
    }
}

/// `MAILBOX_IRQSTATUS_CLR` / `MAILBOX_IRQENABLE_SET` / `MAILBOX_IRQENABLE_CLR`.
///
/// Two bits per mailbox; only the "new message" bits are used here.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct IrqMask(u32);

impl IrqMask {
    /// The "new message" bit of mailbox `m`.
    #[must_use]
    pub const fn new_message(m: u8) -> Self {
        Self(1 << (2 * m as u32))
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn into_bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}
