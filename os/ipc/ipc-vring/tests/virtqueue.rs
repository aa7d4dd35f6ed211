use ipc_mailbox::{CoreId, Mailbox};
use ipc_memory_map::{Identity, VirtualAddress, map};
use ipc_vring::{QueueId, QueueRole, RingStore, SharedRegion, VirtQueue, VirtQueueError, VringLayout};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::RefCell;
use std::ptr::NonNull;

/// Page-aligned, zeroed heap memory standing in for the carveout.
struct SharedMemory {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl SharedMemory {
    fn new(len: usize) -> Self {
        let layout = Layout::from_size_align(len, 4096).unwrap();
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).unwrap();
        Self { ptr, layout }
    }

    fn region(&self) -> SharedRegion<'_> {
        unsafe { SharedRegion::new(self.ptr, self.layout.size() as u64) }
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Records what would have gone out through the mailbox.
#[derive(Default)]
struct RecordingMailbox {
    sent: RefCell<Vec<(CoreId, u32)>>,
}

impl Mailbox for RecordingMailbox {
    fn send(&self, destination: CoreId, payload: u32) {
        self.sent.borrow_mut().push((destination, payload));
    }

    fn clear_and_read(&self) -> Option<u32> {
        None
    }

    fn enable(&self) {}

    fn disable(&self) {}

    fn is_enabled(&self) -> bool {
        true
    }
}

const SMALL: VringLayout = VringLayout::new(4, 4096);

fn buffer(n: u64) -> VirtualAddress {
    VirtualAddress::new(0x8000_0000 + n * u64::from(map::BUFFER_SIZE))
}

/// Both halves of one queue over the same ring, as two cores would see it.
fn pair<'m>(ring: &RingStore<'m>) -> (VirtQueue<'m, Identity>, VirtQueue<'m, Identity>) {
    let base = ring.base().as_mut_ptr::<u8>();
    let base = NonNull::new(base).unwrap();
    let producer_view = unsafe { RingStore::with_layout(base, *ring.layout()) };
    let consumer_view = unsafe { RingStore::with_layout(base, *ring.layout()) };
    (
        VirtQueue::new(QueueId(1), QueueRole::Producer, CoreId::Core1, producer_view, Identity),
        VirtQueue::new(QueueId(1), QueueRole::Consumer, CoreId::Core0, consumer_view, Identity),
    )
}

#[test]
fn buffers_arrive_in_publication_order() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    assert_eq!(producer.add_available(buffer(0)), Ok(3));
    assert_eq!(producer.add_available(buffer(1)), Ok(2));
    assert_eq!(producer.add_available(buffer(2)), Ok(1));

    for n in 0..3 {
        let got = consumer.get_available().unwrap().unwrap();
        assert_eq!(got.buffer, buffer(n));
        assert_eq!(got.len, map::BUFFER_SIZE);
        assert_eq!(u64::from(got.head), n);
    }
    assert_eq!(consumer.get_available(), Ok(None));
}

#[test]
fn full_round_trip_restores_the_free_count() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    producer.add_available(buffer(7)).unwrap();
    assert_eq!(producer.free_count(), 3);
    assert_eq!(producer.get_used(), Ok(None));

    let taken = consumer.get_available().unwrap().unwrap();
    consumer.add_used(taken.head, 100).unwrap();

    let back = producer.get_used().unwrap().unwrap();
    assert_eq!(back.buffer, buffer(7));
    assert_eq!(back.len, 100);
    assert_eq!(producer.free_count(), 4);
    assert_eq!(producer.get_used(), Ok(None));
}

#[test]
fn reported_length_is_capped_at_the_buffer_size() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    producer.add_available(buffer(0)).unwrap();
    let taken = consumer.get_available().unwrap().unwrap();
    consumer.add_used(taken.head, u32::MAX).unwrap();

    assert_eq!(producer.get_used().unwrap().unwrap().len, map::BUFFER_SIZE);
}

#[test]
fn publishing_into_a_full_ring_fails_without_touching_it() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, _consumer) = pair(&ring);

    for n in 0..4 {
        producer.add_available(buffer(n)).unwrap();
    }
    assert_eq!(producer.free_count(), 0);
    assert_eq!(
        producer.add_available(buffer(4)),
        Err(VirtQueueError::NoFreeDescriptors)
    );
    assert_eq!(ring.avail_idx(), 4);
}

#[test]
fn indices_wrap_past_the_capacity() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    for n in 0..=u64::from(SMALL.capacity()) * 3 {
        producer.add_available(buffer(n)).unwrap();
        let taken = consumer.get_available().unwrap().unwrap();
        assert_eq!(taken.buffer, buffer(n));
        consumer.add_used(taken.head, 1).unwrap();
        assert_eq!(producer.get_used().unwrap().unwrap().buffer, buffer(n));
    }

    assert_eq!(producer.free_count(), SMALL.capacity());
    assert_eq!(ring.avail_idx(), SMALL.capacity() * 3 + 1);
    assert_eq!(ring.used_idx(), SMALL.capacity() * 3 + 1);
}

#[test]
fn operations_of_the_other_role_are_rejected() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    assert_eq!(
        consumer.add_available(buffer(0)),
        Err(VirtQueueError::WrongRole(QueueRole::Producer))
    );
    assert_eq!(consumer.get_used(), Err(VirtQueueError::WrongRole(QueueRole::Producer)));
    assert_eq!(producer.get_available(), Err(VirtQueueError::WrongRole(QueueRole::Consumer)));
    assert_eq!(
        producer.add_used(0, 0),
        Err(VirtQueueError::WrongRole(QueueRole::Consumer))
    );
}

#[test]
fn out_of_range_descriptors_are_rejected() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    assert_eq!(
        consumer.add_used(4, 0),
        Err(VirtQueueError::DescriptorOutOfRange { index: 4, capacity: 4 })
    );

    // A peer writing garbage into the used ring.
    producer.add_available(buffer(0)).unwrap();
    ring.write_used_entry(0, ipc_vring::UsedElem { id: 9, len: 0 });
    ring.publish_used_idx(1);
    assert_eq!(
        producer.get_used(),
        Err(VirtQueueError::DescriptorOutOfRange { index: 9, capacity: 4 })
    );
    assert_eq!(producer.free_count(), 3);
}

#[test]
fn kick_respects_the_peer_suppression_flag() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);
    let mailbox = RecordingMailbox::default();

    consumer.disable_notifications();
    producer.add_available(buffer(0)).unwrap();
    assert!(!producer.kick(&mailbox));
    assert!(mailbox.sent.borrow().is_empty());

    consumer.enable_notifications();
    assert!(producer.kick(&mailbox));
    assert_eq!(*mailbox.sent.borrow(), vec![(CoreId::Core1, 1)]);
}

#[test]
fn consumer_kick_follows_the_producer_flag() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, consumer) = pair(&ring);
    let mailbox = RecordingMailbox::default();

    producer.disable_notifications();
    assert!(ring.avail_flags().no_interrupt());
    assert!(!consumer.kick(&mailbox));

    producer.enable_notifications();
    assert!(consumer.kick(&mailbox));
    assert_eq!(*mailbox.sent.borrow(), vec![(CoreId::Core0, 1)]);
}

#[test]
fn draining_consumer_toggles_its_notify_flag() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (mut producer, mut consumer) = pair(&ring);

    producer.add_available(buffer(0)).unwrap();
    consumer.get_available().unwrap().unwrap();
    assert!(ring.used_flags().no_notify());

    assert_eq!(consumer.get_available(), Ok(None));
    assert!(!ring.used_flags().no_notify());
}

#[test]
fn explicit_suppression_survives_draining() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let ring = memory.region().ring(0, SMALL);
    let (_producer, mut consumer) = pair(&ring);

    consumer.disable_notifications();
    assert_eq!(consumer.get_available(), Ok(None));
    assert!(ring.used_flags().no_notify());
    assert!(consumer.notifications_suppressed());
}

#[test]
fn region_places_rings_at_the_map_offsets() {
    let memory = SharedMemory::new(map::SHARED_REGION_SIZE as usize);
    let region = memory.region();

    for id in 0..map::NUM_RINGS {
        let ring = region.ring_for_queue(id, ipc_vring::IPC_LAYOUT).unwrap();
        assert_eq!(ring.base() - region.base(), map::ring_offset(id).unwrap());
        assert_eq!(ring.capacity(), map::NUM_BUFFERS);
    }
    assert!(region.ring_for_queue(map::NUM_RINGS, ipc_vring::IPC_LAYOUT).is_none());
}

#[test]
fn zeroing_the_region_resets_ring_state() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let region = memory.region();
    let ring = region.ring(0, SMALL);
    let (mut producer, _consumer) = pair(&ring);

    producer.add_available(buffer(0)).unwrap();
    assert_eq!(ring.avail_idx(), 1);

    region.zero();
    assert_eq!(ring.avail_idx(), 0);
    assert_eq!(ring.read_descriptor(0), ipc_vring::Descriptor::default());
}

#[test]
#[should_panic(expected = "exceeds")]
fn rings_must_fit_into_the_region() {
    let memory = SharedMemory::new(SMALL.footprint() as usize);
    let _ = memory.region().ring(4096, SMALL);
}
