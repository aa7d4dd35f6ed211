use crate::{Descriptor, RingStore, UsedElem, VirtQueueError};
use core::fmt;
use core::sync::atomic::{Ordering, fence};
use ipc_mailbox::{CoreId, Mailbox};
use ipc_memory_map::{AddressTranslation, VirtualAddress, map};
use log::{error, trace};

/// Small integer naming a queue; also the mailbox payload of its kick.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct QueueId(pub u16);

impl QueueId {
    #[inline]
    #[must_use]
    pub fn as_payload(self) -> u32 {
        u32::from(self.0)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vq{}", self.0)
    }
}

/// Which half of the ring this side owns.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QueueRole {
    /// Owns the descriptor table and the available ring; publishes empty or
    /// filled buffers and takes them back once used.
    Producer,
    /// Owns the used ring; takes published buffers and hands them back.
    Consumer,
}

impl fmt::Display for QueueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        })
    }
}

/// A buffer taken from the available ring.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AvailableBuffer {
    /// Descriptor index; hand it back with [`VirtQueue::add_used`].
    pub head: u16,
    pub buffer: VirtualAddress,
    pub len: u32,
}

/// A buffer returned through the used ring.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UsedBuffer {
    pub head: u16,
    pub buffer: VirtualAddress,
    /// Bytes the consumer reported; never more than the buffer size.
    pub len: u32,
}

/// The producer/consumer protocol on top of one [`RingStore`].
///
/// The engine keeps its own bookkeeping (free descriptors, last indices seen
/// from the peer) privately; only the ring itself is shared. It is `!Sync` by
/// construction of its `&mut self` API: wrap it in a lock when it is used
/// from both task and interrupt context.
pub struct VirtQueue<'m, T> {
    id: QueueId,
    role: QueueRole,
    peer: CoreId,
    ring: RingStore<'m>,
    translation: T,
    buffer_size: u32,
    free: u16,
    last_avail: u16,
    last_used: u16,
    notify_suppressed: bool,
}

impl<'m, T> VirtQueue<'m, T> {
    /// Creates the engine for a freshly zeroed ring.
    #[must_use]
    pub fn new(id: QueueId, role: QueueRole, peer: CoreId, ring: RingStore<'m>, translation: T) -> Self {
        let free = ring.capacity();
        Self {
            id,
            role,
            peer,
            ring,
            translation,
            buffer_size: map::BUFFER_SIZE,
            free,
            last_avail: 0,
            last_used: 0,
            notify_suppressed: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> QueueId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn role(&self) -> QueueRole {
        self.role
    }

    #[inline]
    #[must_use]
    pub const fn peer(&self) -> CoreId {
        self.peer
    }

    #[inline]
    #[must_use]
    pub const fn ring(&self) -> &RingStore<'m> {
        &self.ring
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u16 {
        self.ring.capacity()
    }

    #[inline]
    #[must_use]
    pub const fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Descriptors the producer may still publish.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> u16 {
        self.free
    }

    #[inline]
    #[must_use]
    pub const fn notifications_suppressed(&self) -> bool {
        self.notify_suppressed
    }
}

impl<T: AddressTranslation> VirtQueue<'_, T> {
    fn require(&self, role: QueueRole) -> Result<(), VirtQueueError> {
        if self.role == role {
            Ok(())
        } else {
            error!("{}: {role} operation on a {} queue", self.id, self.role);
            Err(VirtQueueError::WrongRole(role))
        }
    }

    /// Publishes `buffer` to the peer; returns the free count afterwards.
    ///
    /// # Errors
    /// [`VirtQueueError::NoFreeDescriptors`] if every descriptor is in flight,
    /// [`VirtQueueError::WrongRole`] on a consumer queue.
    pub fn add_available(&mut self, buffer: VirtualAddress) -> Result<u16, VirtQueueError> {
        self.require(QueueRole::Producer)?;
        if self.free == 0 {
            error!("{}: no free descriptors", self.id);
            return Err(VirtQueueError::NoFreeDescriptors);
        }
        self.free -= 1;

        // Only this side writes the available index, so the acquire load sees our last publish.
        let idx = self.ring.avail_idx();
        let slot = self.ring.layout().slot(idx);
        self.ring.write_descriptor(
            slot,
            Descriptor {
                addr: self.translation.to_physical(buffer),
                len: self.buffer_size,
                flags: 0,
                next: 0,
            },
        );
        self.ring.write_avail_entry(slot, slot);
        self.ring.publish_avail_idx(idx.wrapping_add(1));

        trace!("{}: published {buffer} in slot {slot}, {} free", self.id, self.free);
        Ok(self.free)
    }

    /// Takes the next buffer the peer published, if any.
    ///
    /// When nothing is pending the peer is asked to kick on new buffers;
    /// while draining, it is asked not to. Explicitly suppressed
    /// notifications (see [`disable_notifications`](Self::disable_notifications))
    /// are left alone.
    ///
    /// # Errors
    /// [`VirtQueueError::WrongRole`] on a producer queue.
    pub fn get_available(&mut self) -> Result<Option<AvailableBuffer>, VirtQueueError> {
        self.require(QueueRole::Consumer)?;

        if self.last_avail == self.ring.avail_idx() {
            if self.notify_suppressed {
                return Ok(None);
            }
            self.ring.set_used_flags(self.ring.used_flags().with_no_notify(false));
            // A buffer published before the flag was visible came without a kick.
            fence(Ordering::SeqCst);
            if self.last_avail == self.ring.avail_idx() {
                return Ok(None);
            }
        }

        if !self.notify_suppressed {
            self.ring.set_used_flags(self.ring.used_flags().with_no_notify(true));
        }

        let head = self.ring.layout().slot(self.last_avail);
        self.last_avail = self.last_avail.wrapping_add(1);

        let desc = self.ring.read_descriptor(head);
        let buffer = self.translation.to_virtual(desc.addr);
        trace!("{}: took {buffer} ({} bytes) from slot {head}", self.id, desc.len);

        Ok(Some(AvailableBuffer {
            head,
            buffer,
            len: desc.len,
        }))
    }

    /// Hands descriptor `head` back to the producer with `len` bytes used.
    ///
    /// # Errors
    /// [`VirtQueueError::DescriptorOutOfRange`] if `head` is not a descriptor
    /// of this ring, [`VirtQueueError::WrongRole`] on a producer queue.
    pub fn add_used(&mut self, head: u16, len: u32) -> Result<(), VirtQueueError> {
        self.require(QueueRole::Consumer)?;
        let capacity = self.capacity();
        if head >= capacity {
            error!("{}: used descriptor {head} out of range", self.id);
            return Err(VirtQueueError::DescriptorOutOfRange {
                index: head,
                capacity,
            });
        }

        let idx = self.ring.used_idx();
        let slot = self.ring.layout().slot(idx);
        self.ring.write_used_entry(
            slot,
            UsedElem {
                id: u32::from(head),
                len,
            },
        );
        self.ring.publish_used_idx(idx.wrapping_add(1));

        trace!("{}: returned descriptor {head} ({len} bytes)", self.id);
        Ok(())
    }

    /// Takes back the next buffer the peer has finished with, if any.
    ///
    /// # Errors
    /// [`VirtQueueError::DescriptorOutOfRange`] if the peer reported a
    /// descriptor outside the ring, [`VirtQueueError::WrongRole`] on a
    /// consumer queue.
    pub fn get_used(&mut self) -> Result<Option<UsedBuffer>, VirtQueueError> {
        self.require(QueueRole::Producer)?;

        if self.last_used == self.ring.used_idx() {
            return Ok(None);
        }

        let slot = self.ring.layout().slot(self.last_used);
        let elem = self.ring.read_used_entry(slot);
        let capacity = self.capacity();
        let head = match u16::try_from(elem.id) {
            Ok(head) if head < capacity => head,
            _ => {
                error!("{}: peer returned descriptor {} out of range", self.id, elem.id);
                return Err(VirtQueueError::DescriptorOutOfRange {
                    index: u16::try_from(elem.id).unwrap_or(u16::MAX),
                    capacity,
                });
            }
        };
        self.last_used = self.last_used.wrapping_add(1);
        self.free += 1;

        let desc = self.ring.read_descriptor(head);
        let buffer = self.translation.to_virtual(desc.addr);
        let len = elem.len.min(desc.len);
        trace!("{}: {buffer} came back with {len} bytes", self.id);

        Ok(Some(UsedBuffer { head, buffer, len }))
    }

    /// Whether the peer currently wants to be interrupted for this queue.
    #[must_use]
    pub fn peer_wants_kick(&self) -> bool {
        // Our index store must be visible before we look at the peer's flag.
        fence(Ordering::SeqCst);
        match self.role {
            QueueRole::Producer => !self.ring.used_flags().no_notify(),
            QueueRole::Consumer => !self.ring.avail_flags().no_interrupt(),
        }
    }

    /// Interrupts the peer with this queue's id, unless it asked not to be.
    ///
    /// Returns whether a mailbox message was sent.
    pub fn kick(&self, mailbox: &impl Mailbox) -> bool {
        if !self.peer_wants_kick() {
            trace!("{}: no kick, {} suppressed notifications", self.id, self.peer);
            return false;
        }

        trace!("{}: kicking {}", self.id, self.peer);
        mailbox.send(self.peer, self.id.as_payload());
        true
    }

    /// Asks the peer to kick this side on ring activity again.
    pub fn enable_notifications(&mut self) {
        self.notify_suppressed = false;
        self.set_own_flag(false);
    }

    /// Asks the peer not to kick this side; the caller polls instead.
    pub fn disable_notifications(&mut self) {
        self.notify_suppressed = true;
        self.set_own_flag(true);
    }

    fn set_own_flag(&self, suppress: bool) {
        match self.role {
            QueueRole::Producer => self
                .ring
                .set_avail_flags(self.ring.avail_flags().with_no_interrupt(suppress)),
            QueueRole::Consumer => self
                .ring
                .set_used_flags(self.ring.used_flags().with_no_notify(suppress)),
        }
    }
}

impl<T> fmt::Debug for VirtQueue<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtQueue")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("free", &self.free)
            .field("last_avail", &self.last_avail)
            .field("last_used", &self.last_used)
            .field("notify_suppressed", &self.notify_suppressed)
            .finish_non_exhaustive()
    }
}
