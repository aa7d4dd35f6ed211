use ipc_sync::SpinLock;
use std::{panic, thread};

#[test]
fn basic_lock_and_raii() {
    let l = SpinLock::new(0_u32);

    {
        let mut g = l.lock();
        *g = 41;
    }

    // previous drop must have unlocked
    {
        let mut g = l.lock();
        *g += 1;
        assert_eq!(*g, 42);
    }
    assert!(!l.is_locked());
}

#[test]
fn try_lock_fails_while_held() {
    let l = SpinLock::new(1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.try_lock().is_none());

    drop(g1);
    assert!(l.try_lock().is_some());
}

#[test]
fn failed_try_lock_leaves_the_holder_in_place() {
    let l = SpinLock::new(5u8);
    let held = l.lock();

    assert!(l.try_lock().is_none());
    assert!(l.is_locked());
    assert!(l.try_lock().is_none());

    drop(held);
    assert!(!l.is_locked());
}

#[test]
fn contended_increments_are_exact() {
    use std::sync::Arc;

    let threads = 4;
    let iters = 2_000;
    let lock = Arc::new(SpinLock::new(0usize));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..iters {
                    lock.with_lock(|v| *v += 1);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(|v| *v), threads * iters);
}

#[test]
fn lock_is_released_on_panic() {
    let l = SpinLock::new(0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");
    assert_eq!(l.with_lock(|v| *v), 123);
}
