use crate::RegistryError;
use core::sync::atomic::{AtomicBool, Ordering};
use ipc_sync::{Semaphore, SpinLock, SyncOnceCell};
use ipc_vring::{QueueId, VirtQueue};
use log::trace;

/// Capacity of the queue table; queue ids are indices into it.
pub const NUM_QUEUES: usize = 5;

/// Invoked from the mailbox interrupt when the peer kicks a queue.
///
/// Runs in interrupt context: must not block. It may call the non-blocking
/// queue operations of the transport.
pub trait QueueCallback: Sync {
    fn on_kick(&self, queue: QueueId);
}

/// One registry entry: the queue engine plus what the dispatcher needs to
/// wake its users.
///
/// The interrupt side only touches atomics and the write-once callback; the
/// queue lock belongs to task context.
pub struct QueueSlot<'m, T> {
    queue: SpinLock<Option<VirtQueue<'m, T>>>,
    callback: SyncOnceCell<Option<&'static dyn QueueCallback>>,
    registered: AtomicBool,
    kicks: Semaphore,
    shutdown: AtomicBool,
}

impl<'m, T> QueueSlot<'m, T> {
    const fn new() -> Self {
        Self {
            queue: SpinLock::new(None),
            callback: SyncOnceCell::new(),
            registered: AtomicBool::new(false),
            kicks: Semaphore::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Runs `f` on the queue engine with the slot locked.
    ///
    /// Callers in task context must mask the mailbox interrupt first.
    pub fn with_queue<R>(&self, f: impl FnOnce(&mut VirtQueue<'m, T>) -> R) -> Option<R> {
        self.queue.lock().as_mut().map(f)
    }

    /// Banked kicks not yet consumed by a receiver.
    #[inline]
    pub const fn kicks(&self) -> &Semaphore {
        &self.kicks
    }

    /// Wakes a receiver with a shutdown notification.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.kicks.post();
    }

    /// Consumes a pending shutdown notification.
    pub fn take_shutdown(&self) -> bool {
        self.shutdown.swap(false, Ordering::AcqRel)
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }
}

/// Fixed table from queue id to queue.
///
/// Filled once during bring-up; entries are never removed.
pub struct Registry<'m, T> {
    slots: [QueueSlot<'m, T>; NUM_QUEUES],
}

impl<T> Default for Registry<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m, T> Registry<'m, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| QueueSlot::new()),
        }
    }

    /// Inserts `queue` under its own id.
    ///
    /// # Errors
    /// [`RegistryError::CapacityExceeded`] if the id is beyond the table,
    /// [`RegistryError::AlreadyRegistered`] if the slot is taken.
    pub fn register(
        &self,
        queue: VirtQueue<'m, T>,
        callback: Option<&'static dyn QueueCallback>,
    ) -> Result<(), RegistryError> {
        let id = queue.id();
        let slot = self.slots.get(id.index()).ok_or(RegistryError::CapacityExceeded {
            id,
            capacity: NUM_QUEUES,
        })?;

        // The callback cell doubles as the claim on the slot.
        slot.callback
            .set(callback)
            .map_err(|_| RegistryError::AlreadyRegistered(id))?;
        *slot.queue.lock() = Some(queue);
        slot.registered.store(true, Ordering::Release);
        Ok(())
    }

    /// The registered slot for `id`.
    #[must_use]
    pub fn get(&self, id: QueueId) -> Option<&QueueSlot<'m, T>> {
        self.slots.get(id.index()).filter(|slot| slot.is_registered())
    }

    /// Delivers a kick for queue `payload`.
    ///
    /// Returns `false` (and does nothing else) if no such queue is registered.
    /// Never takes the queue lock, so it is safe against a task that holds it.
    pub fn dispatch(&self, payload: u32) -> bool {
        let target = u16::try_from(payload)
            .ok()
            .map(QueueId)
            .and_then(|id| self.get(id).map(|slot| (id, slot)));
        let Some((id, slot)) = target else {
            trace!("kick for unregistered queue {payload} dropped");
            return false;
        };

        slot.kicks.post();
        if let Some(callback) = slot.callback.get().copied().flatten() {
            callback.on_kick(id);
        }
        true
    }
}
