use crate::Mailbox;
use ipc_sync::SpinLock;
use log::{trace, warn};

/// Receives every payload arriving in this core's mailbox.
///
/// Runs in interrupt context: must not block.
pub trait MailboxHandler: Sync {
    fn on_message(&self, payload: u32);
}

/// The single interrupt handler slot of a core's mailbox.
///
/// The platform's interrupt vector calls [`isr`](Self::isr) for the shared
/// mailbox line; the payload, if there is one for this core, is handed to the
/// registered [`MailboxHandler`].
pub struct MailboxInterrupt<M> {
    mailbox: M,
    handler: SpinLock<Option<&'static dyn MailboxHandler>>,
}

impl<M: Mailbox> MailboxInterrupt<M> {
    pub const fn new(mailbox: M) -> Self {
        Self {
            mailbox,
            handler: SpinLock::new(None),
        }
    }

    #[inline]
    pub const fn mailbox(&self) -> &M {
        &self.mailbox
    }

    /// Installs `handler` and unmasks this core's mailbox interrupt.
    ///
    /// A previously registered handler is replaced.
    pub fn register(&self, handler: &'static dyn MailboxHandler) {
        self.mailbox.disable();
        *self.handler.lock() = Some(handler);
        self.mailbox.enable();
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Interrupt service routine body.
    ///
    /// Reads (and acknowledges) at most one payload and dispatches it.
    /// Returns whether a payload was consumed; `false` means the shared line
    /// fired for another core's mailbox.
    pub fn isr(&self) -> bool {
        let Some(payload) = self.mailbox.clear_and_read() else {
            return false;
        };

        // Copy the handler out so it runs without the slot locked.
        let handler = *self.handler.lock();
        if let Some(handler) = handler {
            trace!("mailbox interrupt, payload = {payload:#010x}");
            handler.on_message(payload);
        } else {
            warn!("mailbox payload {payload:#010x} arrived before a handler was registered");
        }
        true
    }
}
