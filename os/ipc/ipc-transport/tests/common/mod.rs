#![allow(dead_code)]

use ipc_mailbox::{CoreId, Mailbox};
use ipc_memory_map::{Identity, map};
use ipc_transport::{QueueCallback, Transport, TransportConfig};
use ipc_sync::Wait;
use ipc_vring::{QueueId, SharedRegion};
use std::alloc::{Layout, alloc_zeroed};
use std::collections::{HashMap, VecDeque};
use std::ptr::NonNull;
use std::sync::Mutex;
use std::thread;

pub type TestTransport = Transport<'static, FabricMailbox, Identity>;

/// One payload as it went over the fabric.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Sent {
    pub from: CoreId,
    pub to: CoreId,
    pub payload: u32,
    /// Whether the sender's own mailbox interrupt was masked at the time.
    pub masked: bool,
}

/// All mailboxes of the platform: one inbox per core.
#[derive(Default)]
pub struct Fabric {
    inboxes: Mutex<HashMap<CoreId, VecDeque<u32>>>,
    enabled: Mutex<HashMap<CoreId, bool>>,
    sent: Mutex<Vec<Sent>>,
}

impl Fabric {
    pub fn leak() -> &'static Self {
        Box::leak(Box::default())
    }

    pub fn mailbox(&'static self, local: CoreId) -> FabricMailbox {
        FabricMailbox { fabric: self, local }
    }

    /// Every `(from, to, payload)` sent so far.
    pub fn sent(&self) -> Vec<(CoreId, CoreId, u32)> {
        self.log()
            .into_iter()
            .map(|s| (s.from, s.to, s.payload))
            .collect()
    }

    pub fn log(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Payloads sent from `from` to `to`, in order.
    pub fn sent_between(&self, from: CoreId, to: CoreId) -> Vec<u32> {
        self.sent()
            .into_iter()
            .filter(|&(f, t, _)| f == from && t == to)
            .map(|(_, _, payload)| payload)
            .collect()
    }

    pub fn is_enabled(&self, core: CoreId) -> bool {
        self.enabled.lock().unwrap().get(&core).copied().unwrap_or(false)
    }
}

pub struct FabricMailbox {
    fabric: &'static Fabric,
    local: CoreId,
}

impl Mailbox for FabricMailbox {
    fn send(&self, destination: CoreId, payload: u32) {
        let masked = !self.is_enabled();
        self.fabric
            .inboxes
            .lock()
            .unwrap()
            .entry(destination)
            .or_default()
            .push_back(payload);
        self.fabric
            .sent
            .lock()
            .unwrap()
            .push(Sent {
                from: self.local,
                to: destination,
                payload,
                masked,
            });
    }

    fn clear_and_read(&self) -> Option<u32> {
        self.fabric
            .inboxes
            .lock()
            .unwrap()
            .get_mut(&self.local)
            .and_then(VecDeque::pop_front)
    }

    fn enable(&self) {
        self.fabric.enabled.lock().unwrap().insert(self.local, true);
    }

    fn disable(&self) {
        self.fabric.enabled.lock().unwrap().insert(self.local, false);
    }

    fn is_enabled(&self) -> bool {
        self.fabric.is_enabled(self.local)
    }
}

/// A page-aligned carveout that lives for the rest of the test process.
pub struct SharedMemory {
    ptr: NonNull<u8>,
    len: usize,
}

unsafe impl Send for SharedMemory {}
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    pub fn leak() -> &'static Self {
        let len = map::SHARED_REGION_SIZE as usize;
        let layout = Layout::from_size_align(len, map::PAGE_SIZE as usize).unwrap();
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).unwrap();
        Box::leak(Box::new(Self { ptr, len }))
    }

    /// A fresh view of the carveout, as one core maps it.
    pub fn region(&'static self) -> SharedRegion<'static> {
        unsafe { SharedRegion::new(self.ptr, self.len as u64) }
    }

    pub fn fill(&self, byte: u8) {
        unsafe { self.ptr.as_ptr().write_bytes(byte, self.len) }
    }

    pub fn is_zeroed(&self) -> bool {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
            .iter()
            .all(|&b| b == 0)
    }
}

pub fn transport(
    fabric: &'static Fabric,
    memory: &'static SharedMemory,
    config: TransportConfig,
) -> &'static TestTransport {
    Box::leak(Box::new(Transport::new(
        config,
        fabric.mailbox(config.local),
        memory.region(),
        Identity,
    )))
}

/// Takes interrupts on `core` for as long as there are payloads and the
/// interrupt is unmasked, like the hardware would.
pub fn pump(core: &TestTransport) -> usize {
    let mut handled = 0;
    while core.mailbox().is_enabled() && core.on_interrupt() {
        handled += 1;
    }
    handled
}

pub static SUBORDINATES: [CoreId; 2] = [CoreId::Core0, CoreId::Core1];

/// The DSP orchestrating both IPU cores, all brought up over the fabric.
pub struct Platform {
    pub fabric: &'static Fabric,
    pub memory: &'static SharedMemory,
    pub dsp: &'static TestTransport,
    pub core0: &'static TestTransport,
    pub core1: &'static TestTransport,
}

impl Platform {
    pub fn new() -> Self {
        let fabric = Fabric::leak();
        let memory = SharedMemory::leak();
        let dsp = transport(
            fabric,
            memory,
            TransportConfig::orchestrator(CoreId::Dsp, &SUBORDINATES),
        );
        let core0 = transport(fabric, memory, TransportConfig::subordinate(CoreId::Core0));
        let core1 = transport(fabric, memory, TransportConfig::subordinate(CoreId::Core1));
        Self {
            fabric,
            memory,
            dsp,
            core0,
            core1,
        }
    }

    /// Runs every bring-up; each subordinate blocks in its own thread while
    /// this thread plays the interrupt lines.
    pub fn bring_up(self) -> Self {
        let subordinates = [self.core0, self.core1];
        let waiters = subordinates.map(|core| thread::spawn(move || core.startup(Wait::Forever)));
        for core in SUBORDINATES {
            while !self.fabric.is_enabled(core) {
                thread::yield_now();
            }
        }

        self.dsp.startup(Wait::Never).unwrap();
        while !waiters.iter().all(thread::JoinHandle::is_finished) {
            for core in subordinates {
                pump(core);
            }
            thread::yield_now();
        }
        for waiter in waiters {
            waiter.join().unwrap().unwrap();
        }
        self
    }
}

/// Records every kick it is called for.
#[derive(Default)]
pub struct KickRecorder {
    kicks: Mutex<Vec<QueueId>>,
}

impl KickRecorder {
    pub fn leak() -> &'static Self {
        Box::leak(Box::default())
    }

    pub fn kicks(&self) -> Vec<QueueId> {
        self.kicks.lock().unwrap().clone()
    }
}

impl QueueCallback for KickRecorder {
    fn on_kick(&self, queue: QueueId) {
        self.kicks.lock().unwrap().push(queue);
    }
}
