//! Lifetime management for native objects.
//!
//! A [`Handle`] owns one native object and frees it exactly once, after the
//! last in-flight call has finished. It combines two reference counts in a
//! single atomic counter:
//!
//! - the owning reference, present from birth until [`Handle::destroy`]
//! - one call reference per live [`HandleGuard`]
//!
//! ```text
//! inflight:  0 ──acquire──► 1 ──release──► 0 ──destroy──► -1 (freed)
//!            │                                              ▲
//!            └──destroy (guards live)──► n-1 ──last release─┘
//! ```
//!
//! Whichever of the last release or the destroy moves the counter to the
//! sentinel `-1` performs the free. Acquire uses a compare-and-swap loop so
//! that no call can start once the sentinel has been reached; decrements use
//! acquire-release ordering so the freeing thread observes every call that
//! finished before it.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::fault::{raise, BridgeFault};
use crate::kinds::{ObjectKind, RawObject};
use crate::native::{FreeObjectFn, NativeCore};

/// Counter value once the object has been freed.
const RELEASED: i64 = -1;

type ReleaseFn = Box<dyn Fn(NonNull<c_void>) + Send + Sync>;

/// Owner of one native object of kind `K`.
///
/// Dropping the handle destroys it, so ownership is always scoped; no
/// finalizer is involved.
pub struct Handle<K: ObjectKind> {
    address: NonNull<c_void>,
    inflight: AtomicI64,
    destroyed: AtomicBool,
    release: ReleaseFn,
    _kind: PhantomData<K>,
}

// SAFETY: native objects behind handles are safe to call from any thread;
// the handle only shares the address and atomics.
unsafe impl<K: ObjectKind> Send for Handle<K> {}
unsafe impl<K: ObjectKind> Sync for Handle<K> {}

impl<K: ObjectKind> Handle<K> {
    /// Wraps a raw object, calling `release` once when it is freed.
    ///
    /// Raises a fault if the object is null or tagged as another kind.
    pub fn new(raw: RawObject, release: impl Fn(NonNull<c_void>) + Send + Sync + 'static) -> Self {
        if !raw.is::<K>() {
            raise(BridgeFault::ObjectKindMismatch {
                expected: K::NAME,
                actual: raw.tag(),
            });
        }
        let Some(address) = NonNull::new(raw.address()) else {
            raise(BridgeFault::NullObject { kind: K::NAME })
        };
        Handle {
            address,
            inflight: AtomicI64::new(0),
            destroyed: AtomicBool::new(false),
            release: Box::new(release),
            _kind: PhantomData,
        }
    }

    /// Wraps a raw object freed through a native free entry point.
    pub fn adopt(core: Arc<NativeCore>, raw: RawObject, free: FreeObjectFn) -> Self {
        Handle::new(raw, move |address| {
            // SAFETY: the address came from `core` as a `K`, and the handle
            // calls this at most once.
            core.call(|status| unsafe { free(address.as_ptr(), status) })
        })
    }

    /// Starts a call on the object.
    ///
    /// The returned guard keeps the object alive until it is dropped.
    /// Raises a fault if the object has been destroyed.
    pub fn acquire(&self) -> HandleGuard<'_, K> {
        match self.try_acquire() {
            Some(guard) => guard,
            None => raise(BridgeFault::UseAfterDestroy { kind: K::NAME }),
        }
    }

    /// Like [`acquire`](Self::acquire), but returns `None` once the object
    /// has been destroyed.
    pub fn try_acquire(&self) -> Option<HandleGuard<'_, K>> {
        if self.destroyed.load(Ordering::Acquire) {
            return None;
        }
        let mut current = self.inflight.load(Ordering::Acquire);
        loop {
            if current <= RELEASED {
                return None;
            }
            if current == i64::MAX {
                raise(BridgeFault::CallCounterOverflow { kind: K::NAME });
            }
            match self.inflight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        trace!(kind = K::NAME, inflight = current + 1, "acquired");
        Some(HandleGuard { handle: self })
    }

    fn release(&self) {
        let inflight = self.inflight.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!(kind = K::NAME, inflight, "released");
        if inflight == RELEASED {
            self.free();
        } else if inflight < RELEASED {
            raise(BridgeFault::DoubleRelease { kind: K::NAME });
        }
    }

    /// Drops the owning reference.
    ///
    /// Only the first call has an effect. The object is freed now if no
    /// call is in flight, otherwise when the last guard is dropped.
    pub fn destroy(&self) {
        if self
            .destroyed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let inflight = self.inflight.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(kind = K::NAME, inflight, "destroyed");
        if inflight == RELEASED {
            self.free();
        }
    }

    fn free(&self) {
        debug!(kind = K::NAME, address = ?self.address, "freeing native object");
        (self.release)(self.address);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Returns true once the native object has been freed.
    pub fn is_released(&self) -> bool {
        self.inflight.load(Ordering::Acquire) == RELEASED
    }

    /// Number of calls currently in flight.
    pub fn inflight(&self) -> i64 {
        let n = self.inflight.load(Ordering::Acquire);
        if self.is_destroyed() {
            n + 1
        } else {
            n
        }
    }
}

impl<K: ObjectKind> Drop for Handle<K> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<K: ObjectKind> std::fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::NAME)
            .field("address", &self.address)
            .field("inflight", &self.inflight.load(Ordering::Relaxed))
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}

/// A call in flight on a [`Handle`].
///
/// Dropping the guard ends the call, including on error and panic paths.
pub struct HandleGuard<'a, K: ObjectKind> {
    handle: &'a Handle<K>,
}

impl<K: ObjectKind> HandleGuard<'_, K> {
    /// The native address, valid while the guard is alive.
    pub fn as_ptr(&self) -> *mut c_void {
        self.handle.address.as_ptr()
    }
}

impl<K: ObjectKind> Drop for HandleGuard<'_, K> {
    fn drop(&mut self) {
        self.handle.release();
    }
}
