//! # Firmware trace buffer
//!
//! A `log` backend for cores without a console. Records are formatted into a
//! circular buffer in memory ([`TRACE`]), which the host reads out of the
//! firmware image after the fact, or dumps when the core crashed.
//!
//! ```text
//! log::info!(..) ──► TraceLogger ──► trace_write! ──► TraceBuffer (oldest bytes overwritten)
//! ```
//!
//! Formatting goes through `format_args!` into the buffer directly; nothing
//! allocates. With the `enabled` feature turned off, [`trace_write!`] compiles
//! to nothing and the logger only filters.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod buffer;
mod logger;

pub use buffer::{TraceBuffer, TraceSink};
pub use logger::TraceLogger;

/// Size of the global trace buffer in bytes.
pub const TRACE_BUFFER_SIZE: usize = 0x8000;

/// The core's trace buffer.
pub static TRACE: TraceBuffer<TRACE_BUFFER_SIZE> = TraceBuffer::new();

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod trace_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    pub fn trace_write(args: fmt::Arguments) {
        crate::TRACE.write_fmt(args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod trace_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    pub fn trace_write(_: fmt::Arguments) {}
}

/// Formats into the global trace buffer.
///
/// ```
/// ipc_trace::trace_write!("vq{} kicked\n", 3);
/// ```
#[macro_export]
macro_rules! trace_write {
    ($($arg:tt)*) => {{
        $crate::trace_fmt::trace_write(core::format_args!($($arg)*));
    }};
}
