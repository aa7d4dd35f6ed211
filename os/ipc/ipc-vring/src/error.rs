use crate::QueueRole;

/// Protocol precondition violations.
///
/// All of these are detected before shared memory is written; the ring is
/// still consistent when one is returned, but the caller has broken the
/// protocol and should stop using the queue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VirtQueueError {
    #[error("no free descriptors left to publish a buffer")]
    NoFreeDescriptors,
    #[error("descriptor index {index} is outside the ring (capacity {capacity})")]
    DescriptorOutOfRange { index: u16, capacity: u16 },
    #[error("operation requires the {0} role")]
    WrongRole(QueueRole),
}
