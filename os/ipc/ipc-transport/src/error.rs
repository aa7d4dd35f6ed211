use crate::BootState;
use ipc_vring::{QueueId, QueueRole, VirtQueueError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("{id} does not fit into a registry of {capacity} queues")]
    CapacityExceeded { id: QueueId, capacity: usize },
    #[error("{0} is already registered")]
    AlreadyRegistered(QueueId),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BootstrapError {
    #[error("peer did not complete the handshake (stuck in {state:?})")]
    PeerTimeout { state: BootState },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Queue(#[from] VirtQueueError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("{0} is not registered")]
    UnknownQueue(QueueId),
    #[error("{queue} is a {role} queue")]
    WrongRole { queue: QueueId, role: QueueRole },
    #[error("direction {0} is neither 0 (towards the IPU) nor 1 (from the IPU)")]
    InvalidDirection(u16),
    #[error("no shared ring between {0} and {1}")]
    NoRing(ipc_mailbox::CoreId, ipc_mailbox::CoreId),
    #[error("the bootstrap handshake has not completed")]
    NotReady,
    #[error("receive was unblocked by a shutdown notification")]
    Unblocked,
    #[error("timed out waiting for a buffer")]
    Timeout,
}
