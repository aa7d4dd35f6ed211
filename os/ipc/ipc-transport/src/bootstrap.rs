use crate::BootstrapError;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use ipc_sync::{Semaphore, Wait};
use log::{info, trace};

/// Progress of the two-message handshake on a subordinate core.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum BootState {
    WaitingForReady = 0,
    WaitingForBaseAddress = 1,
    Ready = 2,
}

impl BootState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::WaitingForReady,
            1 => Self::WaitingForBaseAddress,
            _ => Self::Ready,
        }
    }
}

/// Who drives the handshake.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootRole {
    /// Zeroes the shared region and announces it; never waits.
    Orchestrator,
    /// Waits for `READY` and the base address before touching any ring.
    Subordinate,
}

/// The bootstrap state machine.
///
/// Transitions are driven from the mailbox handler; the bring-up task
/// blocks in [`wait`](Self::wait) until both stages have been released.
pub struct Bootstrap {
    state: AtomicU8,
    stage: Semaphore,
    releases: AtomicU32,
    announced: AtomicBool,
    announced_base: AtomicU32,
}

impl Bootstrap {
    #[must_use]
    pub const fn new(role: BootRole) -> Self {
        let state = match role {
            BootRole::Orchestrator => BootState::Ready,
            BootRole::Subordinate => BootState::WaitingForReady,
        };
        Self {
            state: AtomicU8::new(state as u8),
            stage: Semaphore::new(0),
            releases: AtomicU32::new(0),
            announced: AtomicBool::new(false),
            announced_base: AtomicU32::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> BootState {
        BootState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == BootState::Ready
    }

    /// How many times the waiting task has been released so far.
    #[inline]
    #[must_use]
    pub fn releases(&self) -> u32 {
        self.releases.load(Ordering::Acquire)
    }

    /// The base address the orchestrator announced, if it did.
    ///
    /// Informational only: rings are always placed at the fixed carveout.
    #[must_use]
    pub fn announced_base(&self) -> Option<u32> {
        self.announced
            .load(Ordering::Acquire)
            .then(|| self.announced_base.load(Ordering::Relaxed))
    }

    fn advance(&self, from: BootState, to: BootState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::AcqRel);
        self.stage.post();
    }

    /// Handles the `READY` tag. Returns whether it started the handshake.
    pub fn on_ready(&self) -> bool {
        if !self.advance(BootState::WaitingForReady, BootState::WaitingForBaseAddress) {
            trace!("READY ignored in state {:?}", self.state());
            return false;
        }
        info!("peer ready, waiting for the shared base address");
        self.release();
        true
    }

    /// Handles a non-control payload before the handshake completed.
    ///
    /// While waiting for `READY` the payload is dropped. While waiting for the
    /// base address it is recorded as such and completes the handshake.
    /// Returns whether the payload was consumed as the base address.
    pub fn on_payload(&self, payload: u32) -> bool {
        if self.state() != BootState::WaitingForBaseAddress {
            trace!("payload {payload:#010x} dropped before READY");
            return false;
        }

        self.announced_base.store(payload, Ordering::Relaxed);
        self.announced.store(true, Ordering::Release);
        if !self.advance(BootState::WaitingForBaseAddress, BootState::Ready) {
            return false;
        }
        info!("peer announced shared base {payload:#010x}, transport ready");
        self.release();
        true
    }

    /// Blocks until both handshake stages have been released.
    ///
    /// # Errors
    /// [`BootstrapError::PeerTimeout`] if a stage did not arrive within
    /// `wait`; the state reached so far is kept and waiting can be retried.
    pub fn wait(&self, wait: Wait) -> Result<(), BootstrapError> {
        for _ in 0..2 {
            self.stage.pend(wait).map_err(|_| BootstrapError::PeerTimeout {
                state: self.state(),
            })?;
        }
        Ok(())
    }
}
