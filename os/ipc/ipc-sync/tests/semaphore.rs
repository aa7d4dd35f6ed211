use ipc_sync::{Semaphore, SemaphoreError, SyncOnceCell, Wait};
use std::sync::Arc;
use std::thread;

#[test]
fn posts_are_banked() {
    let sem = Semaphore::new(0);
    sem.post();
    sem.post();
    assert_eq!(sem.count(), 2);
    assert!(sem.pend(Wait::Never).is_ok());
    assert!(sem.pend(Wait::Never).is_ok());
    assert_eq!(sem.pend(Wait::Never), Err(SemaphoreError::Timeout));
}

#[test]
fn bounded_pend_times_out() {
    let sem = Semaphore::default();
    assert_eq!(sem.pend(Wait::Spins(1_000)), Err(SemaphoreError::Timeout));
    assert_eq!(sem.count(), 0);
}

#[test]
fn pend_forever_is_released_by_other_thread() {
    let sem = Arc::new(Semaphore::new(0));
    let poster = {
        let sem = Arc::clone(&sem);
        thread::spawn(move || {
            sem.post();
            sem.post();
        })
    };

    sem.pend(Wait::Forever).unwrap();
    sem.pend(Wait::Forever).unwrap();
    poster.join().unwrap();
    assert!(!sem.try_pend());
}

#[test]
fn once_cell_rejects_second_set() {
    let cell = SyncOnceCell::new();
    assert!(cell.get().is_none());
    assert_eq!(cell.set(1u32).copied(), Ok(1));
    assert_eq!(cell.set(2u32), Err(2));
    assert_eq!(cell.get_or_init(|| 3), &1);
}

#[test]
fn once_cell_initializes_lazily() {
    static CELL: SyncOnceCell<u64> = SyncOnceCell::new();
    assert_eq!(*CELL.get_or_init(|| 0xA000_0000), 0xA000_0000);
    assert_eq!(CELL.get(), Some(&0xA000_0000));
}
