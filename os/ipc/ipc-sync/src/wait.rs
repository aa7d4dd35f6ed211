use core::hint::spin_loop;

/// How long a spinning operation may wait before giving up.
///
/// There is no clock in this layer, so bounded waits are expressed as a
/// number of polls of the condition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Wait {
    /// Poll exactly once.
    Never,
    /// Poll at most this many times.
    Spins(u32),
    /// Poll until the condition holds, however long that takes.
    #[default]
    Forever,
}

/// Spins until `condition` returns `true` or the wait budget is exhausted.
///
/// Returns `true` if the condition was observed, `false` on timeout.
///
/// ```
/// # use ipc_sync::{Wait, spin_until};
/// let mut polls = 0;
/// assert!(spin_until(Wait::Forever, || { polls += 1; polls == 3 }));
/// assert!(!spin_until(Wait::Spins(10), || false));
/// ```
#[inline]
pub fn spin_until(wait: Wait, mut condition: impl FnMut() -> bool) -> bool {
    match wait {
        Wait::Never => condition(),
        Wait::Spins(budget) => {
            for _ in 0..budget.max(1) {
                if condition() {
                    return true;
                }
                spin_loop();
            }
            false
        }
        Wait::Forever => {
            while !condition() {
                spin_loop();
            }
            true
        }
    }
}
