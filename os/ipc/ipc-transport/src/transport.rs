use crate::control::{self, ControlMessage};
use crate::{BootRole, Bootstrap, BootstrapError, QueueCallback, Registry, TransportError};
use ipc_mailbox::{CoreId, Mailbox, MailboxHandler, MailboxInterrupt, MailboxIrqGuard};
use ipc_memory_map::{AddressTranslation, VirtualAddress, map};
use ipc_sync::Wait;
use ipc_vring::{
    AvailableBuffer, IPC_LAYOUT, QueueId, QueueRole, SharedRegion, UsedBuffer, VirtQueue,
    VringLayout,
};
use log::{error, info, trace, warn};

/// The base address the orchestrator announces during the handshake.
#[allow(clippy::cast_possible_truncation)]
pub const ANNOUNCED_BASE: u32 = map::SHARED_BASE.as_u64() as u32;

/// Static description of this core's place in the fabric.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransportConfig {
    pub local: CoreId,
    pub role: BootRole,
    /// Receives echo replies and crash/boot notifications.
    pub host: CoreId,
    /// Cores the orchestrator announces the shared region to.
    pub subordinates: &'static [CoreId],
}

impl TransportConfig {
    #[must_use]
    pub const fn orchestrator(local: CoreId, subordinates: &'static [CoreId]) -> Self {
        Self {
            local,
            role: BootRole::Orchestrator,
            host: CoreId::Host,
            subordinates,
        }
    }

    #[must_use]
    pub const fn subordinate(local: CoreId) -> Self {
        Self {
            local,
            role: BootRole::Subordinate,
            host: CoreId::Host,
            subordinates: &[],
        }
    }

    #[must_use]
    pub const fn with_host(mut self, host: CoreId) -> Self {
        self.host = host;
        self
    }
}

/// Names a queue created through [`Transport::create_queue`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QueueHandle {
    pub id: QueueId,
    pub role: QueueRole,
    pub peer: CoreId,
}

/// Where the queue for `direction` between `local` and `peer` lives, and
/// which half of it `local` owns.
///
/// Direction 0 carries buffers towards the IPU core, direction 1 away from
/// it. Queues of the second IPU core are numbered after those of the first.
///
/// # Errors
/// [`TransportError::InvalidDirection`] for directions other than 0 and 1,
/// [`TransportError::NoRing`] if exactly one of the two cores is not an IPU
/// core.
pub fn queue_placement(
    local: CoreId,
    peer: CoreId,
    direction: u16,
) -> Result<(QueueId, QueueRole), TransportError> {
    if direction > 1 {
        return Err(TransportError::InvalidDirection(direction));
    }

    let ipu = match (local.is_ipu(), peer.is_ipu()) {
        (true, false) => local,
        (false, true) => peer,
        _ => return Err(TransportError::NoRing(local, peer)),
    };

    let id = QueueId(direction + if ipu == CoreId::Core1 { 2 } else { 0 });
    let towards_local = (direction == 0) == (ipu == local);
    let role = if towards_local {
        QueueRole::Consumer
    } else {
        QueueRole::Producer
    };
    Ok((id, role))
}

/// Everything one core needs to talk over the shared rings.
///
/// Owns the mailbox, the bootstrap state and the queue registry; the mailbox
/// interrupt is routed back into [`dispatch`](Self::dispatch) once
/// [`startup`](Transport::startup) registered it.
pub struct Transport<'m, M, T> {
    config: TransportConfig,
    interrupt: MailboxInterrupt<M>,
    region: SharedRegion<'m>,
    layout: VringLayout,
    translation: T,
    bootstrap: Bootstrap,
    registry: Registry<'m, T>,
}

impl<'m, M: Mailbox, T: AddressTranslation + Clone> Transport<'m, M, T> {
    #[must_use]
    pub fn new(config: TransportConfig, mailbox: M, region: SharedRegion<'m>, translation: T) -> Self {
        Self {
            config,
            interrupt: MailboxInterrupt::new(mailbox),
            region,
            layout: IPC_LAYOUT,
            translation,
            bootstrap: Bootstrap::new(config.role),
            registry: Registry::new(),
        }
    }

    /// Uses `layout` instead of the deployment ring layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: VringLayout) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    #[inline]
    #[must_use]
    pub const fn region(&self) -> &SharedRegion<'m> {
        &self.region
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry<'m, T> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub const fn mailbox(&self) -> &M {
        self.interrupt.mailbox()
    }

    /// Body of the mailbox interrupt. Returns whether a payload was handled.
    pub fn on_interrupt(&self) -> bool {
        self.interrupt.isr()
    }

    /// Routes one mailbox payload.
    ///
    /// Control tags come first, in every state. Before the handshake
    /// completed, other payloads belong to the handshake. After that they
    /// are queue ids; kicks for unregistered queues are dropped.
    ///
    /// # Panics
    /// On [`ControlMessage::AbortRequest`], which asks this core to crash.
    pub fn dispatch(&self, payload: u32) {
        if control::is_reserved(payload) {
            self.handle_control(payload);
        } else if !self.bootstrap.is_ready() {
            self.bootstrap.on_payload(payload);
        } else {
            self.registry.dispatch(payload);
        }
    }

    fn handle_control(&self, payload: u32) {
        match ControlMessage::from_payload(payload) {
            Some(ControlMessage::Ready) => {
                self.bootstrap.on_ready();
            }
            Some(ControlMessage::EchoRequest) => {
                trace!("echo request, replying to {}", self.config.host);
                self.mailbox().send(self.config.host, ControlMessage::EchoReply.tag());
            }
            Some(ControlMessage::AbortRequest) => {
                error!("{}: abort requested", self.config.local);
                panic!("crash on demand");
            }
            Some(other) => warn!("control message {other} not handled, dropped"),
            None => warn!("reserved payload {payload:#010x} dropped"),
        }
    }

    /// Tells the host this core crashed.
    pub fn post_crash(&self) {
        self.mailbox().send(self.config.host, ControlMessage::Crash.tag());
    }

    /// Tells the host this core finished its initialization.
    pub fn post_init_done(&self) {
        self.mailbox().send(self.config.host, ControlMessage::BootInitDone.tag());
    }

    /// Creates and registers this core's half of the queue for `direction`
    /// with `peer`.
    ///
    /// `callback` runs in interrupt context whenever the peer kicks the queue.
    ///
    /// # Errors
    /// [`TransportError::NotReady`] before the handshake completed, placement
    /// errors from [`queue_placement`], and [`TransportError::Registry`] if
    /// the queue already exists.
    pub fn create_queue(
        &self,
        callback: Option<&'static dyn QueueCallback>,
        peer: CoreId,
        direction: u16,
    ) -> Result<QueueHandle, TransportError> {
        if !self.bootstrap.is_ready() {
            return Err(TransportError::NotReady);
        }

        let local = self.config.local;
        let (id, role) = queue_placement(local, peer, direction)?;
        let ring = self
            .region
            .ring_for_queue(id.0, self.layout)
            .ok_or(TransportError::NoRing(local, peer))?;
        let queue = VirtQueue::new(id, role, peer, ring, self.translation.clone());

        let _masked = MailboxIrqGuard::new(self.mailbox());
        self.registry.register(queue, callback)?;

        // Host and DSP fill receive queues in bulk; no kick per buffer.
        if role == QueueRole::Consumer && !peer.is_ipu() {
            if let Some(slot) = self.registry.get(id) {
                slot.with_queue(|queue| {
                    let ring = queue.ring();
                    ring.set_used_flags(ring.used_flags().with_no_notify(true));
                });
            }
        }

        info!("{id}: {local} is {role} towards {peer}");
        Ok(QueueHandle { id, role, peer })
    }

    fn with_queue<R>(
        &self,
        handle: QueueHandle,
        role: QueueRole,
        f: impl FnOnce(&mut VirtQueue<'m, T>, &M) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        if handle.role != role {
            return Err(TransportError::WrongRole {
                queue: handle.id,
                role: handle.role,
            });
        }
        let mailbox = self.mailbox();
        let _masked = MailboxIrqGuard::new(mailbox);
        let slot = self
            .registry
            .get(handle.id)
            .ok_or(TransportError::UnknownQueue(handle.id))?;
        slot.with_queue(|queue| f(queue, mailbox))
            .unwrap_or(Err(TransportError::UnknownQueue(handle.id)))
    }

    /// Publishes `buffer` to the peer and kicks it if it wants to be kicked.
    ///
    /// Returns the number of buffers that can still be published.
    ///
    /// # Errors
    /// [`TransportError::Queue`] if every buffer is in flight; role and
    /// lookup errors otherwise.
    pub fn send(&self, handle: QueueHandle, buffer: VirtualAddress) -> Result<u16, TransportError> {
        self.with_queue(handle, QueueRole::Producer, |queue, mailbox| {
            let free = queue.add_available(buffer)?;
            queue.kick(mailbox);
            Ok(free)
        })
    }

    /// Takes back a buffer the peer has finished with.
    ///
    /// # Errors
    /// [`TransportError::Queue`] if the peer returned a bogus descriptor;
    /// role and lookup errors otherwise.
    pub fn reclaim(&self, handle: QueueHandle) -> Result<Option<UsedBuffer>, TransportError> {
        self.with_queue(handle, QueueRole::Producer, |queue, _| {
            queue.get_used().map_err(Into::into)
        })
    }

    /// Waits up to `wait` for the peer to publish a buffer.
    ///
    /// # Errors
    /// [`TransportError::Timeout`] if nothing arrived in time,
    /// [`TransportError::Unblocked`] if [`notify_shutdown`](Self::notify_shutdown)
    /// was called; role and lookup errors otherwise.
    pub fn receive(&self, handle: QueueHandle, wait: Wait) -> Result<AvailableBuffer, TransportError> {
        loop {
            let received = self.with_queue(handle, QueueRole::Consumer, |queue, _| {
                queue.get_available().map_err(Into::into)
            })?;
            if let Some(buffer) = received {
                return Ok(buffer);
            }

            let slot = self
                .registry
                .get(handle.id)
                .ok_or(TransportError::UnknownQueue(handle.id))?;
            if slot.take_shutdown() {
                return Err(TransportError::Unblocked);
            }
            slot.kicks().pend(wait).map_err(|_| TransportError::Timeout)?;
        }
    }

    /// Hands a received buffer back to the peer with `len` bytes used.
    ///
    /// # Errors
    /// [`TransportError::Queue`] if `head` is not a descriptor of the ring;
    /// role and lookup errors otherwise.
    pub fn complete(&self, handle: QueueHandle, head: u16, len: u32) -> Result<(), TransportError> {
        self.with_queue(handle, QueueRole::Consumer, |queue, mailbox| {
            queue.add_used(head, len)?;
            queue.kick(mailbox);
            Ok(())
        })
    }

    /// Asks the peer to kick (or not kick) this side for `handle`.
    ///
    /// # Errors
    /// [`TransportError::UnknownQueue`] if the queue is not registered.
    pub fn set_notifications(&self, handle: QueueHandle, enabled: bool) -> Result<(), TransportError> {
        self.with_queue(handle, handle.role, |queue, _| {
            if enabled {
                queue.enable_notifications();
            } else {
                queue.disable_notifications();
            }
            Ok(())
        })
    }

    /// Wakes a receiver blocked on `handle` with [`TransportError::Unblocked`].
    ///
    /// The ring is left as it is.
    ///
    /// # Errors
    /// [`TransportError::UnknownQueue`] if the queue is not registered.
    pub fn notify_shutdown(&self, handle: QueueHandle) -> Result<(), TransportError> {
        let slot = self
            .registry
            .get(handle.id)
            .ok_or(TransportError::UnknownQueue(handle.id))?;
        slot.request_shutdown();
        Ok(())
    }
}

impl<M, T> Transport<'static, M, T>
where
    M: Mailbox + Sync + 'static,
    T: AddressTranslation + Clone + Send + Sync + 'static,
{
    /// Brings the transport up; call once per core.
    ///
    /// The orchestrator zeroes the shared region, installs the mailbox
    /// handler and announces the region to every subordinate. A subordinate
    /// installs the handler and waits up to `wait` for each handshake stage.
    ///
    /// # Errors
    /// [`BootstrapError::PeerTimeout`] if a subordinate's handshake did not
    /// complete in time.
    pub fn startup(&'static self, wait: Wait) -> Result<(), BootstrapError> {
        let local = self.config.local;
        match self.config.role {
            BootRole::Orchestrator => {
                self.region.zero();
                self.interrupt.register(self);
                for &core in self.config.subordinates {
                    info!("{local}: announcing shared memory to {core}");
                    self.mailbox().send(core, ControlMessage::Ready.tag());
                    self.mailbox().send(core, ANNOUNCED_BASE);
                }
            }
            BootRole::Subordinate => {
                self.interrupt.register(self);
                info!("{local}: waiting for the bootstrap handshake");
                self.bootstrap.wait(wait)?;
            }
        }
        info!("{local}: transport up");
        Ok(())
    }
}

impl<M, T> MailboxHandler for Transport<'_, M, T>
where
    M: Mailbox + Sync,
    T: AddressTranslation + Clone + Send + Sync,
{
    fn on_message(&self, payload: u32) {
        self.dispatch(payload);
    }
}
