//! Byte regions that move across the boundary.
//!
//! Three shapes are involved:
//!
//! - [`TransferBuffer`]: an owned region handed from one side to the other.
//!   Whoever holds it must pass it back to the allocating side's free
//!   function exactly once.
//! - [`ForeignBytes`]: a borrowed view the native side copies from and
//!   never frees.
//! - [`OwnedBuffer`]: host-side scoped owner of a natively allocated
//!   [`TransferBuffer`], freeing it through the native core on drop.

use std::mem::ManuallyDrop;
use std::ptr;

use crate::fault::{raise, BridgeFault};
use crate::native::NativeCore;

/// An owned byte region plus its length and capacity.
///
/// A null `data` pointer is the empty buffer and needs no free.
#[repr(C)]
#[derive(Debug)]
pub struct TransferBuffer {
    pub capacity: u32,
    pub len: u32,
    pub data: *mut u8,
}

impl TransferBuffer {
    /// The null buffer.
    pub const fn empty() -> Self {
        TransferBuffer {
            capacity: 0,
            len: 0,
            data: ptr::null_mut(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_null() || self.len == 0
    }

    /// Hands a vector allocated by the Rust global allocator across the
    /// boundary. The receiver must return it to a free function that calls
    /// [`into_vec`](Self::into_vec).
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let (Ok(capacity), Ok(len)) = (u32::try_from(bytes.capacity()), u32::try_from(bytes.len()))
        else {
            raise(BridgeFault::BufferTooLarge(bytes.capacity()))
        };
        let mut bytes = ManuallyDrop::new(bytes);
        TransferBuffer {
            capacity,
            len,
            data: bytes.as_mut_ptr(),
        }
    }

    /// Reclaims a buffer created by [`from_vec`](Self::from_vec).
    ///
    /// # Safety
    ///
    /// The buffer must have come from `from_vec` in this process and must
    /// not have been reclaimed before.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        Vec::from_raw_parts(self.data, self.len as usize, self.capacity as usize)
    }

    /// Views the initialized bytes.
    ///
    /// # Safety
    ///
    /// `data` must be null or point to at least `len` initialized bytes
    /// that stay valid for the returned lifetime.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.is_empty() {
            &[]
        } else {
            std::slice::from_raw_parts(self.data, self.len as usize)
        }
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

/// A borrowed byte view passed to the native side, which copies it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignBytes {
    pub len: i32,
    pub data: *const u8,
}

impl ForeignBytes {
    /// Borrows `bytes` for the duration of one native call.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let Ok(len) = i32::try_from(bytes.len()) else {
            raise(BridgeFault::BufferTooLarge(bytes.len()))
        };
        ForeignBytes {
            len,
            data: bytes.as_ptr(),
        }
    }

    /// # Safety
    ///
    /// `data` must be null or point to `len` readable bytes.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.data.is_null() || self.len <= 0 {
            &[]
        } else {
            std::slice::from_raw_parts(self.data, self.len as usize)
        }
    }
}

/// A natively allocated buffer owned by the host for a scope.
///
/// Dropping it frees the buffer through the native core that allocated it.
/// [`into_raw`](Self::into_raw) hands ownership to a native entry point
/// that consumes its argument instead.
pub struct OwnedBuffer<'a> {
    core: &'a NativeCore,
    buf: ManuallyDrop<TransferBuffer>,
}

impl<'a> OwnedBuffer<'a> {
    /// Takes ownership of a buffer allocated by `core`.
    pub fn new(core: &'a NativeCore, buf: TransferBuffer) -> Self {
        OwnedBuffer {
            core,
            buf: ManuallyDrop::new(buf),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the buffer came from the native core, which guarantees
        // `len` initialized bytes until it is freed, and we have not freed it.
        unsafe { self.buf.as_slice() }
    }

    /// Releases ownership without freeing.
    pub fn into_raw(self) -> TransferBuffer {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the buffer is moved out once.
        unsafe { ManuallyDrop::take(&mut this.buf) }
    }
}

impl Drop for OwnedBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: drop runs once and `into_raw` skips it.
        let buf = unsafe { ManuallyDrop::take(&mut self.buf) };
        if !buf.is_null() {
            self.core.free_buffer(buf);
        }
    }
}
