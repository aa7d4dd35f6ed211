use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity circular byte buffer.
///
/// Writers never block: each write reserves its byte range with one atomic
/// add and the oldest bytes are overwritten. A logger preempted mid-record by
/// an interrupt that logs too keeps going once the handler returns; records
/// of the two may then interleave. A snapshot taken during a write can show
/// that write partially.
///
/// `N` must be a power of two so positions stay consistent when the cursor
/// wraps.
pub struct TraceBuffer<const N: usize> {
    bytes: [AtomicU8; N],
    /// Total bytes reserved since the last clear, modulo `usize`.
    cursor: AtomicUsize,
    full: AtomicBool,
}

impl<const N: usize> Default for TraceBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TraceBuffer<N> {
    #[must_use]
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two(), "trace buffer size must be a power of two") };
        Self {
            bytes: [const { AtomicU8::new(0) }; N],
            cursor: AtomicUsize::new(0),
            full: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.full.load(Ordering::Acquire) {
            N
        } else {
            self.cursor.load(Ordering::Acquire).min(N)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_bytes(&self, bytes: &[u8]) {
        let start = self.cursor.fetch_add(bytes.len(), Ordering::AcqRel);
        let end = start.wrapping_add(bytes.len());
        if end >= N || end < start {
            self.full.store(true, Ordering::Release);
        }
        for (i, &b) in bytes.iter().enumerate() {
            self.bytes[start.wrapping_add(i) % N].store(b, Ordering::Relaxed);
        }
    }

    /// Formats `args` into the buffer. Formatting errors are dropped.
    pub fn write_fmt(&self, args: fmt::Arguments) {
        let _ = fmt::write(&mut TraceSink(self), args);
    }

    /// Copies the contents, oldest byte first, into `out`.
    ///
    /// Returns the number of bytes copied; at most `out.len()`, keeping the
    /// oldest bytes if `out` is too small.
    pub fn snapshot(&self, out: &mut [u8]) -> usize {
        let end = self.cursor.load(Ordering::Acquire);
        let held = if self.full.load(Ordering::Acquire) {
            N
        } else {
            end.min(N)
        };
        let oldest = end.wrapping_sub(held);

        let copied = held.min(out.len());
        for (i, slot) in out[..copied].iter_mut().enumerate() {
            *slot = self.bytes[oldest.wrapping_add(i) % N].load(Ordering::Relaxed);
        }
        copied
    }

    pub fn clear(&self) {
        self.full.store(false, Ordering::Release);
        self.cursor.store(0, Ordering::Release);
    }
}

/// `fmt::Write` adapter over a [`TraceBuffer`].
pub struct TraceSink<'a, const N: usize>(pub &'a TraceBuffer<N>);

impl<const N: usize> Write for TraceSink<'_, N> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}
