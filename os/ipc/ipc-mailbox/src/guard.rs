use crate::Mailbox;

/// RAII guard that masks the local mailbox interrupt while held.
///
/// Task code that takes a lock the mailbox handler also takes must hold one
/// of these first; otherwise the handler can preempt the lock holder on the
/// same core and spin forever.
///
/// The guard snapshots the mask state on creation and only unmasks on drop
/// if the interrupt was unmasked before, so guards nest and are harmless
/// inside the handler itself.
///
/// ```
/// # use ipc_mailbox::{CoreId, Mailbox, MailboxIrqGuard};
/// # use core::cell::Cell;
/// # struct Fake(Cell<bool>);
/// # impl Mailbox for Fake {
/// #     fn send(&self, _: CoreId, _: u32) {}
/// #     fn clear_and_read(&self) -> Option<u32> { None }
/// #     fn enable(&self) { self.0.set(true) }
/// #     fn disable(&self) { self.0.set(false) }
/// #     fn is_enabled(&self) -> bool { self.0.get() }
/// # }
/// let mbox = Fake(Cell::new(true));
/// {
///     let _g = MailboxIrqGuard::new(&mbox);
///     assert!(!mbox.is_enabled());
///     let _nested = MailboxIrqGuard::new(&mbox);
/// }
/// assert!(mbox.is_enabled());
/// ```
pub struct MailboxIrqGuard<'a, M: Mailbox + ?Sized> {
    mailbox: &'a M,
    were_enabled: bool,
}

impl<'a, M: Mailbox + ?Sized> MailboxIrqGuard<'a, M> {
    #[inline]
    #[must_use]
    pub fn new(mailbox: &'a M) -> Self {
        let were_enabled = mailbox.is_enabled();
        if were_enabled {
            mailbox.disable();
        }
        Self {
            mailbox,
            were_enabled,
        }
    }
}

impl<M: Mailbox + ?Sized> Drop for MailboxIrqGuard<'_, M> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.mailbox.enable();
        }
    }
}
