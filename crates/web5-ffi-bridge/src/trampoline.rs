//! Exported functions the native core calls to reach host callbacks.
//!
//! The native core holds a [`ForeignSigner`] or [`ForeignKeyManager`]
//! vtable: a registry ID plus pointers to the trampolines below. Each
//! trampoline resolves the ID in the installed [`Callbacks`] and runs the
//! host implementation.
//!
//! Results allocated here must come back through the matching
//! `web5_foreign_*_free` export. A null result means the capability is
//! unavailable (unknown ID, revoked callback, or callback error).
//!
//! A panic is never unwound into native frames: it is logged and the
//! process aborts.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use tracing::{error, warn};
use web5_types::JwkData;
use web5_wire::Wire;

use crate::buffer::{ForeignBytes, TransferBuffer};
use crate::callback::{
    dispatch_get_signer, dispatch_import_private_jwk, dispatch_sign, CallbackId, CallbackKind,
    Callbacks,
};
use crate::fault::{raise, BridgeFault};

/// Signature of [`web5_foreign_signer_sign`].
pub type SignTrampolineFn = unsafe extern "C" fn(
    signer_id: i32,
    payload: *const u8,
    len: usize,
    out_len: *mut usize,
) -> *mut u8;
/// Signature of [`web5_foreign_key_manager_import_private_jwk`].
pub type ImportJwkTrampolineFn =
    unsafe extern "C" fn(manager_id: i32, private_jwk: ForeignBytes) -> TransferBuffer;
/// Signature of [`web5_foreign_key_manager_get_signer`].
pub type GetSignerTrampolineFn =
    unsafe extern "C" fn(manager_id: i32, public_jwk: ForeignBytes) -> *mut ForeignSigner;

/// A host signer as seen by the native core.
#[repr(C)]
#[derive(Debug)]
pub struct ForeignSigner {
    pub signer_id: i32,
    pub sign: SignTrampolineFn,
}

impl ForeignSigner {
    pub fn new(id: CallbackId) -> Self {
        ForeignSigner {
            signer_id: id.as_raw(),
            sign: web5_foreign_signer_sign,
        }
    }

    /// Boxes the vtable. Release it with [`web5_foreign_signer_free`].
    pub fn into_raw(self) -> *mut ForeignSigner {
        Box::into_raw(Box::new(self))
    }
}

/// A host key manager as seen by the native core.
#[repr(C)]
#[derive(Debug)]
pub struct ForeignKeyManager {
    pub manager_id: i32,
    pub import_private_jwk: ImportJwkTrampolineFn,
    pub get_signer: GetSignerTrampolineFn,
}

impl ForeignKeyManager {
    pub fn new(id: CallbackId) -> Self {
        ForeignKeyManager {
            manager_id: id.as_raw(),
            import_private_jwk: web5_foreign_key_manager_import_private_jwk,
            get_signer: web5_foreign_key_manager_get_signer,
        }
    }

    /// Boxes the vtable. Release it with [`web5_foreign_key_manager_free`].
    pub fn into_raw(self) -> *mut ForeignKeyManager {
        Box::into_raw(Box::new(self))
    }
}

fn guard_trampoline<T>(name: &'static str, body: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            error!(trampoline = name, "panic in host callback, aborting");
            std::process::abort()
        }
    }
}

fn installed_callbacks(kind: CallbackKind) -> Option<&'static Callbacks> {
    let callbacks = Callbacks::installed();
    if callbacks.is_none() {
        warn!(%kind, "callback invoked before callbacks were installed");
    }
    callbacks
}

fn lift_argument<T: Wire>(bytes: &[u8]) -> T {
    match web5_wire::lift(bytes) {
        Ok(value) => value,
        Err(source) => raise(BridgeFault::lift::<T>(source)),
    }
}

/// Signs `payload` with the host signer registered as `signer_id`.
///
/// On success returns the signature and stores its length in `out_len`;
/// release it with [`web5_foreign_bytes_free`]. Returns null if the signer
/// is unavailable.
///
/// # Safety
///
/// - `payload` must be null or point to `len` readable bytes
/// - `out_len` must be a valid pointer to writable memory
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_signer_sign(
    signer_id: i32,
    payload: *const u8,
    len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    guard_trampoline("web5_foreign_signer_sign", || {
        if out_len.is_null() {
            return ptr::null_mut();
        }
        *out_len = 0;

        let Some(callbacks) = installed_callbacks(CallbackKind::Signer) else {
            return ptr::null_mut();
        };
        let payload = if payload.is_null() || len == 0 {
            &[][..]
        } else {
            std::slice::from_raw_parts(payload, len)
        };

        match dispatch_sign(callbacks, CallbackId::from_raw(signer_id), payload) {
            Some(signature) => {
                let signature = signature.into_boxed_slice();
                *out_len = signature.len();
                Box::into_raw(signature).cast::<u8>()
            }
            None => ptr::null_mut(),
        }
    })
}

/// Imports a wire-encoded private JWK into the host key manager registered
/// as `manager_id`.
///
/// Returns the wire-encoded public JWK, or the null buffer if the key
/// manager is unavailable. Release the result with
/// [`web5_foreign_buffer_free`].
///
/// # Safety
///
/// `private_jwk` must describe readable memory.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_key_manager_import_private_jwk(
    manager_id: i32,
    private_jwk: ForeignBytes,
) -> TransferBuffer {
    guard_trampoline("web5_foreign_key_manager_import_private_jwk", || {
        let Some(callbacks) = installed_callbacks(CallbackKind::KeyManager) else {
            return TransferBuffer::empty();
        };
        let private_jwk: JwkData = lift_argument(private_jwk.as_slice());

        match dispatch_import_private_jwk(callbacks, CallbackId::from_raw(manager_id), private_jwk)
        {
            Some(public_jwk) => TransferBuffer::from_vec(web5_wire::lower(&public_jwk)),
            None => TransferBuffer::empty(),
        }
    })
}

/// Asks the host key manager registered as `manager_id` for a signer.
///
/// The signer is registered and returned as a new [`ForeignSigner`];
/// release it with [`web5_foreign_signer_free`]. Returns null if the key
/// manager is unavailable.
///
/// # Safety
///
/// `public_jwk` must describe readable memory.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_key_manager_get_signer(
    manager_id: i32,
    public_jwk: ForeignBytes,
) -> *mut ForeignSigner {
    guard_trampoline("web5_foreign_key_manager_get_signer", || {
        let Some(callbacks) = installed_callbacks(CallbackKind::KeyManager) else {
            return ptr::null_mut();
        };
        let public_jwk: JwkData = lift_argument(public_jwk.as_slice());

        match dispatch_get_signer(callbacks, CallbackId::from_raw(manager_id), public_jwk) {
            Some(signer_id) => ForeignSigner::new(signer_id).into_raw(),
            None => ptr::null_mut(),
        }
    })
}

/// Releases a signature returned by [`web5_foreign_signer_sign`].
///
/// # Safety
///
/// `data` and `len` must be exactly what the trampoline returned, and must
/// not be released twice.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_bytes_free(data: *mut u8, len: usize) {
    if data.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
}

/// Releases a buffer returned by a key manager trampoline.
///
/// # Safety
///
/// `buf` must have been returned by a trampoline in this crate and must not
/// be released twice.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_buffer_free(buf: TransferBuffer) {
    drop(buf.into_vec());
}

/// Releases a [`ForeignSigner`] and unregisters its host signer.
///
/// # Safety
///
/// `signer` must be null or come from [`ForeignSigner::into_raw`], and
/// must not be released twice.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_signer_free(signer: *mut ForeignSigner) {
    if signer.is_null() {
        return;
    }
    let signer = Box::from_raw(signer);
    if let Some(callbacks) = Callbacks::installed() {
        callbacks
            .signers
            .unregister(CallbackId::from_raw(signer.signer_id));
    }
}

/// Releases a [`ForeignKeyManager`] and unregisters its host key manager.
///
/// # Safety
///
/// `manager` must be null or come from [`ForeignKeyManager::into_raw`], and
/// must not be released twice.
#[no_mangle]
pub unsafe extern "C" fn web5_foreign_key_manager_free(manager: *mut ForeignKeyManager) {
    if manager.is_null() {
        return;
    }
    let manager = Box::from_raw(manager);
    if let Some(callbacks) = Callbacks::installed() {
        callbacks
            .key_managers
            .unregister(CallbackId::from_raw(manager.manager_id));
    }
}
