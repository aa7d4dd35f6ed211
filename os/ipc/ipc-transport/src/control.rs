//! Out-of-band messages sharing the mailbox with queue kicks.

use core::fmt;

/// First reserved payload value; nothing at or above it is ever a queue id.
pub const RESERVED_BASE: u32 = 0xFFFF_FF00;

/// Whether `payload` lies in the reserved control range.
#[inline]
#[must_use]
pub const fn is_reserved(payload: u32) -> bool {
    payload >= RESERVED_BASE
}

/// The fixed control tags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum ControlMessage {
    /// The orchestrator has zeroed the shared region; starts the handshake.
    Ready = RESERVED_BASE,
    StateChange = RESERVED_BASE + 0x01,
    /// Sent to the host when this core crashed.
    Crash = RESERVED_BASE + 0x02,
    /// Liveness check; answered with [`EchoReply`](Self::EchoReply).
    EchoRequest = RESERVED_BASE + 0x03,
    EchoReply = RESERVED_BASE + 0x04,
    /// Deliberately crashes the receiving core.
    AbortRequest = RESERVED_BASE + 0x05,
    FlushCache = RESERVED_BASE + 0x06,
    Hibernation = RESERVED_BASE + 0x07,
    /// Sent to the host once this core finished its own initialization.
    BootInitDone = RESERVED_BASE + 0x08,
}

impl ControlMessage {
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Decodes a payload; `None` for queue ids and unassigned reserved values.
    #[must_use]
    pub const fn from_payload(payload: u32) -> Option<Self> {
        Some(match payload {
            0xFFFF_FF00 => Self::Ready,
            0xFFFF_FF01 => Self::StateChange,
            0xFFFF_FF02 => Self::Crash,
            0xFFFF_FF03 => Self::EchoRequest,
            0xFFFF_FF04 => Self::EchoReply,
            0xFFFF_FF05 => Self::AbortRequest,
            0xFFFF_FF06 => Self::FlushCache,
            0xFFFF_FF07 => Self::Hibernation,
            0xFFFF_FF08 => Self::BootInitDone,
            _ => return None,
        })
    }
}

impl From<ControlMessage> for u32 {
    fn from(message: ControlMessage) -> Self {
        message.tag()
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "READY",
            Self::StateChange => "STATE_CHANGE",
            Self::Crash => "CRASH",
            Self::EchoRequest => "ECHO_REQUEST",
            Self::EchoReply => "ECHO_REPLY",
            Self::AbortRequest => "ABORT_REQUEST",
            Self::FlushCache => "FLUSH_CACHE",
            Self::Hibernation => "HIBERNATION",
            Self::BootInitDone => "BOOTINIT_DONE",
        })
    }
}
