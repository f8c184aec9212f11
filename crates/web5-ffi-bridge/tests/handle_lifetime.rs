//! Concurrency properties of the handle lifetime manager.

use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use rand::Rng;
use web5_ffi_bridge::{Handle, KeyManagerKind, RawObject, SignerKind};

fn counted_handle() -> (Arc<Handle<SignerKind>>, Arc<AtomicUsize>) {
    let frees = Arc::new(AtomicUsize::new(0));
    let counter = frees.clone();
    let raw = RawObject::new::<SignerKind>(NonNull::<u8>::dangling().as_ptr().cast());
    let handle = Handle::new(raw, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (Arc::new(handle), frees)
}

/// N calls in flight, then destroy, then the calls finish in random order.
fn destroy_during_calls(n: usize) {
    let (handle, frees) = counted_handle();
    let acquired = Arc::new(Barrier::new(n + 1));
    let destroyed = Arc::new(Barrier::new(n + 1));

    let workers: Vec<_> = (0..n)
        .map(|_| {
            let handle = handle.clone();
            let acquired = acquired.clone();
            let destroyed = destroyed.clone();
            thread::spawn(move || {
                let guard = handle.acquire();
                acquired.wait();
                destroyed.wait();
                for _ in 0..rand::thread_rng().gen_range(0..16) {
                    thread::yield_now();
                }
                drop(guard);
            })
        })
        .collect();

    acquired.wait();
    handle.destroy();
    let expected_now = if n == 0 { 1 } else { 0 };
    assert_eq!(frees.load(Ordering::SeqCst), expected_now);
    destroyed.wait();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(frees.load(Ordering::SeqCst), 1);
    assert!(handle.is_released());
}

#[test]
fn test_single_release_with_no_calls() {
    destroy_during_calls(0);
}

#[test]
fn test_single_release_with_one_call() {
    destroy_during_calls(1);
}

#[test]
fn test_single_release_with_ten_calls() {
    destroy_during_calls(10);
}

#[test]
fn test_single_release_with_thousand_calls() {
    destroy_during_calls(1000);
}

#[test]
fn test_single_release_under_random_interleavings() {
    for _ in 0..50 {
        let (handle, frees) = counted_handle();
        let threads = rand::thread_rng().gen_range(1..8);
        let start = Arc::new(Barrier::new(threads + 1));

        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let handle = handle.clone();
                let start = start.clone();
                thread::spawn(move || {
                    start.wait();
                    let mut rng = rand::thread_rng();
                    let mut completed = 0usize;
                    for _ in 0..rng.gen_range(1..64) {
                        let Some(guard) = handle.try_acquire() else {
                            break;
                        };
                        if rng.gen_bool(0.5) {
                            thread::yield_now();
                        }
                        drop(guard);
                        completed += 1;
                    }
                    completed
                })
            })
            .collect();

        start.wait();
        for _ in 0..rand::thread_rng().gen_range(0..32) {
            thread::yield_now();
        }
        handle.destroy();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(frees.load(Ordering::SeqCst), 1);
        assert!(handle.try_acquire().is_none());
    }
}

#[test]
fn test_concurrent_destroy_frees_once() {
    let (handle, frees) = counted_handle();
    let start = Arc::new(Barrier::new(8));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                handle.destroy();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(frees.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_of_last_owner_frees() {
    let (handle, frees) = counted_handle();
    let other = handle.clone();
    drop(handle);
    assert_eq!(frees.load(Ordering::SeqCst), 0);
    drop(other);
    assert_eq!(frees.load(Ordering::SeqCst), 1);
}

#[test]
fn test_use_after_destroy_is_fatal() {
    let (handle, frees) = counted_handle();
    handle.destroy();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = handle.acquire();
    }));
    assert!(result.is_err());
    assert_eq!(frees.load(Ordering::SeqCst), 1);
}

#[test]
#[should_panic(expected = "expected KeyManager object, got Signer")]
fn test_wrong_kind_is_rejected() {
    let raw = RawObject::new::<SignerKind>(NonNull::<u8>::dangling().as_ptr().cast());
    let _handle: Handle<KeyManagerKind> = Handle::new(raw, |_| {});
}
