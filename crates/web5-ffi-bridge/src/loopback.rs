//! An in-process native core.
//!
//! Implements the native side of every boundary convention in Rust, so the
//! bridge can be exercised without loading the real library:
//!
//! - argument buffers are consumed, result buffers are allocated with
//!   [`TransferBuffer::from_vec`] and released through `buffer_free`
//! - domain errors are written to the status as encoded [`Web5Error`]s
//! - panics are caught and written to the status as their message
//! - objects live behind `Box::into_raw` until their free entry point runs
//! - signers and key managers built from host vtables call back through
//!   the exported trampolines
//!
//! Signing here is a placeholder transformation, not cryptography.

use std::collections::HashMap;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use web5_types::{JwkData, Web5Error};
use web5_wire::{ByteArray, Wire};

use crate::buffer::{ForeignBytes, TransferBuffer};
use crate::native::{NativeCore, CONTRACT_VERSION};
use crate::objects::{KeyManagerFns, SignerFns, ThumbprintFn};
use crate::status::CallStatus;
use crate::trampoline::{
    web5_foreign_buffer_free, web5_foreign_bytes_free, web5_foreign_key_manager_free,
    web5_foreign_signer_free, ForeignKeyManager, ForeignSigner,
};

static CORE: Lazy<Arc<NativeCore>> = Lazy::new(|| {
    Arc::new(
        NativeCore::builder("web5", buffer_from_bytes, buffer_free, contract_version)
            .checksum("method_signer_sign", checksum_method_signer_sign)
            .checksum(
                "constructor_inmemorykeymanager_new",
                checksum_constructor_inmemorykeymanager_new,
            )
            .checksum(
                "method_inmemorykeymanager_import_private_jwk",
                checksum_method_inmemorykeymanager_import_private_jwk,
            )
            .checksum(
                "method_inmemorykeymanager_get_signer",
                checksum_method_inmemorykeymanager_get_signer,
            )
            .build(),
    )
});

/// The loopback core's function table.
pub fn core() -> Arc<NativeCore> {
    CORE.clone()
}

pub fn signer_fns() -> SignerFns {
    SignerFns {
        sign: signer_sign,
        free: signer_free,
        from_foreign: Some(signer_from_foreign),
    }
}

pub fn key_manager_fns() -> KeyManagerFns {
    KeyManagerFns {
        new: key_manager_new,
        from_foreign: Some(key_manager_from_foreign),
        import_private_jwk: key_manager_import_private_jwk,
        get_signer: key_manager_get_signer,
        free: key_manager_free,
        signer: signer_fns(),
    }
}

pub fn thumbprint_fn() -> ThumbprintFn {
    compute_thumbprint
}

/// Runs an entry point body, reporting errors and panics through `status`.
///
/// Returns `None` when the status is not success; the entry point then
/// returns a placeholder value the host never reads.
fn rust_call<T>(
    status: *mut CallStatus,
    body: impl FnOnce() -> Result<T, Web5Error>,
) -> Option<T> {
    // SAFETY: every entry point receives the host's live status record.
    let status = unsafe { &mut *status };
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            status.set_error(TransferBuffer::from_vec(web5_wire::lower(&e)));
            None
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            let message_buf = if message.is_empty() {
                TransferBuffer::empty()
            } else {
                TransferBuffer::from_vec(message.into_bytes())
            };
            status.set_panic(message_buf);
            None
        }
    }
}

/// Takes ownership of an argument buffer and decodes it.
///
/// # Safety
///
/// `buf` must have been allocated by `buffer_from_bytes`.
unsafe fn lift_arg<T: Wire>(buf: TransferBuffer) -> T {
    let bytes = buf.into_vec();
    match web5_wire::lift(&bytes) {
        Ok(value) => value,
        Err(e) => panic!("failed to lift {} argument: {}", std::any::type_name::<T>(), e),
    }
}

fn into_object<T>(value: T) -> *mut c_void {
    Box::into_raw(Box::new(value)).cast()
}

unsafe extern "C" fn buffer_from_bytes(
    bytes: ForeignBytes,
    status: *mut CallStatus,
) -> TransferBuffer {
    rust_call(status, || Ok(TransferBuffer::from_vec(bytes.as_slice().to_vec())))
        .unwrap_or_default()
}

unsafe extern "C" fn buffer_free(buf: TransferBuffer, status: *mut CallStatus) {
    rust_call(status, || {
        drop(buf.into_vec());
        Ok(())
    });
}

unsafe extern "C" fn contract_version(_status: *mut CallStatus) -> u32 {
    CONTRACT_VERSION
}

macro_rules! loopback_checksum {
    ($name:ident, $value:literal) => {
        unsafe extern "C" fn $name(_status: *mut CallStatus) -> u16 {
            $value
        }
    };
}

loopback_checksum!(checksum_method_signer_sign, 43601);
loopback_checksum!(checksum_constructor_inmemorykeymanager_new, 11548);
loopback_checksum!(checksum_method_inmemorykeymanager_import_private_jwk, 24698);
loopback_checksum!(checksum_method_inmemorykeymanager_get_signer, 36296);

fn unavailable(what: &str) -> Web5Error {
    Web5Error::host("Unavailable", format!("{} callback is unavailable", what))
}

/// Host signer vtable owned by a native signer.
struct ForeignSignerRef(*mut ForeignSigner);

impl ForeignSignerRef {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, Web5Error> {
        let mut len = 0usize;
        // SAFETY: the vtable stays valid until this wrapper is dropped.
        unsafe {
            let vtable = &*self.0;
            let data = (vtable.sign)(vtable.signer_id, payload.as_ptr(), payload.len(), &mut len);
            if data.is_null() {
                return Err(unavailable("signer"));
            }
            let signature = std::slice::from_raw_parts(data, len).to_vec();
            web5_foreign_bytes_free(data, len);
            Ok(signature)
        }
    }
}

impl Drop for ForeignSignerRef {
    fn drop(&mut self) {
        // SAFETY: the vtable was handed over by `signer_from_foreign` or a
        // key manager trampoline and is released once, here.
        unsafe { web5_foreign_signer_free(self.0) }
    }
}

/// Host key manager vtable owned by a native key manager.
struct ForeignKeyManagerRef(*mut ForeignKeyManager);

impl ForeignKeyManagerRef {
    fn import_private_jwk(&self, private_jwk: &JwkData) -> Result<JwkData, Web5Error> {
        let encoded = web5_wire::lower(private_jwk);
        // SAFETY: as for `ForeignSignerRef`.
        unsafe {
            let vtable = &*self.0;
            let buf =
                (vtable.import_private_jwk)(vtable.manager_id, ForeignBytes::from_slice(&encoded));
            if buf.is_null() {
                return Err(unavailable("key manager"));
            }
            let decoded = web5_wire::lift::<JwkData>(buf.as_slice());
            web5_foreign_buffer_free(buf);
            decoded.map_err(|e| Web5Error::host("InvalidResult", e.to_string()))
        }
    }

    fn get_signer(&self, public_jwk: &JwkData) -> Result<LoopbackSigner, Web5Error> {
        let encoded = web5_wire::lower(public_jwk);
        // SAFETY: as for `ForeignSignerRef`.
        unsafe {
            let vtable = &*self.0;
            let signer = (vtable.get_signer)(vtable.manager_id, ForeignBytes::from_slice(&encoded));
            if signer.is_null() {
                return Err(unavailable("key manager"));
            }
            Ok(LoopbackSigner::Foreign(ForeignSignerRef(signer)))
        }
    }
}

impl Drop for ForeignKeyManagerRef {
    fn drop(&mut self) {
        // SAFETY: handed over by `key_manager_from_foreign`, released once.
        unsafe { web5_foreign_key_manager_free(self.0) }
    }
}

enum LoopbackSigner {
    /// Signs with a private key held by the core.
    Local(JwkData),
    /// Delegates to a host signer.
    Foreign(ForeignSignerRef),
}

impl LoopbackSigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, Web5Error> {
        match self {
            LoopbackSigner::Local(private_jwk) => {
                let key = private_jwk.d.as_deref().unwrap_or_default().as_bytes();
                Ok(payload
                    .iter()
                    .zip(key.iter().cycle())
                    .map(|(byte, k)| byte ^ k)
                    .collect())
            }
            LoopbackSigner::Foreign(signer) => signer.sign(payload),
        }
    }
}

enum LoopbackKeyManager {
    /// Private keys by their `x` member.
    InMemory(Mutex<HashMap<String, JwkData>>),
    Foreign(ForeignKeyManagerRef),
}

impl LoopbackKeyManager {
    fn import_private_jwk(&self, private_jwk: JwkData) -> Result<JwkData, Web5Error> {
        match self {
            LoopbackKeyManager::InMemory(keys) => {
                if private_jwk.d.as_deref().map_or(true, str::is_empty) {
                    return Err(Web5Error::new(
                        "Jwk",
                        "MissingPrivateKey",
                        "private key material (d) must be present",
                    ));
                }
                let public_jwk = private_jwk.to_public();
                keys.lock().insert(private_jwk.x.clone(), private_jwk);
                Ok(public_jwk)
            }
            LoopbackKeyManager::Foreign(manager) => manager.import_private_jwk(&private_jwk),
        }
    }

    fn get_signer(&self, public_jwk: JwkData) -> Result<LoopbackSigner, Web5Error> {
        match self {
            LoopbackKeyManager::InMemory(keys) => match keys.lock().get(&public_jwk.x) {
                Some(private_jwk) => Ok(LoopbackSigner::Local(private_jwk.clone())),
                None => Err(Web5Error::new(
                    "KeyManager",
                    "NotFound",
                    format!("no private key for x={}", public_jwk.x),
                )),
            },
            LoopbackKeyManager::Foreign(manager) => manager.get_signer(&public_jwk),
        }
    }
}

unsafe extern "C" fn signer_sign(
    signer: *mut c_void,
    payload: TransferBuffer,
    status: *mut CallStatus,
) -> TransferBuffer {
    rust_call(status, || {
        let signer = &*signer.cast::<LoopbackSigner>();
        let payload: ByteArray = lift_arg(payload);
        let signature = signer.sign(payload.as_slice())?;
        Ok(TransferBuffer::from_vec(web5_wire::lower(&ByteArray(signature))))
    })
    .unwrap_or_default()
}

unsafe extern "C" fn signer_from_foreign(
    vtable: *mut ForeignSigner,
    status: *mut CallStatus,
) -> *mut c_void {
    rust_call(status, || {
        if vtable.is_null() {
            panic!("null signer vtable");
        }
        Ok(into_object(LoopbackSigner::Foreign(ForeignSignerRef(vtable))))
    })
    .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn signer_free(signer: *mut c_void, status: *mut CallStatus) {
    rust_call(status, || {
        drop(Box::from_raw(signer.cast::<LoopbackSigner>()));
        Ok(())
    });
}

unsafe extern "C" fn key_manager_new(status: *mut CallStatus) -> *mut c_void {
    rust_call(status, || {
        Ok(into_object(LoopbackKeyManager::InMemory(Mutex::new(
            HashMap::new(),
        ))))
    })
    .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn key_manager_from_foreign(
    vtable: *mut ForeignKeyManager,
    status: *mut CallStatus,
) -> *mut c_void {
    rust_call(status, || {
        if vtable.is_null() {
            panic!("null key manager vtable");
        }
        Ok(into_object(LoopbackKeyManager::Foreign(ForeignKeyManagerRef(
            vtable,
        ))))
    })
    .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn key_manager_import_private_jwk(
    manager: *mut c_void,
    private_jwk: TransferBuffer,
    status: *mut CallStatus,
) -> TransferBuffer {
    rust_call(status, || {
        let manager = &*manager.cast::<LoopbackKeyManager>();
        let public_jwk = manager.import_private_jwk(lift_arg(private_jwk))?;
        Ok(TransferBuffer::from_vec(web5_wire::lower(&public_jwk)))
    })
    .unwrap_or_default()
}

unsafe extern "C" fn key_manager_get_signer(
    manager: *mut c_void,
    public_jwk: TransferBuffer,
    status: *mut CallStatus,
) -> *mut c_void {
    rust_call(status, || {
        let manager = &*manager.cast::<LoopbackKeyManager>();
        let signer = manager.get_signer(lift_arg(public_jwk))?;
        Ok(into_object(signer))
    })
    .unwrap_or(ptr::null_mut())
}

unsafe extern "C" fn key_manager_free(manager: *mut c_void, status: *mut CallStatus) {
    rust_call(status, || {
        drop(Box::from_raw(manager.cast::<LoopbackKeyManager>()));
        Ok(())
    });
}

/// RFC 7638 members of a JWK in lexicographic order.
fn canonical_members(jwk: &JwkData) -> String {
    match &jwk.y {
        Some(y) => format!(
            r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
            jwk.crv, jwk.kty, jwk.x, y
        ),
        None => format!(
            r#"{{"crv":"{}","kty":"{}","x":"{}"}}"#,
            jwk.crv, jwk.kty, jwk.x
        ),
    }
}

/// FNV-1a, 64 bit.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

unsafe extern "C" fn compute_thumbprint(
    jwk: TransferBuffer,
    status: *mut CallStatus,
) -> TransferBuffer {
    rust_call(status, || {
        let jwk: JwkData = lift_arg(jwk);
        let digest = fnv1a(canonical_members(&jwk).as_bytes());
        Ok(TransferBuffer::from_vec(format!("{:016x}", digest).into_bytes()))
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::CallStatusCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_is_written_to_status() {
        let mut status = CallStatus::default();
        let value: Option<u8> = rust_call(&mut status, || {
            Err(Web5Error::new("Jwk", "Invalid", "bad"))
        });
        assert_eq!(value, None);
        assert_eq!(status.code(), Some(CallStatusCode::Error));
        let bytes = unsafe { std::mem::take(&mut status.error_buf).into_vec() };
        assert_eq!(
            web5_wire::lift::<Web5Error>(&bytes).unwrap(),
            Web5Error::new("Jwk", "Invalid", "bad")
        );
    }

    #[test]
    fn test_panic_is_written_to_status() {
        let mut status = CallStatus::default();
        let value: Option<u8> = rust_call(&mut status, || panic!("core exploded"));
        assert_eq!(value, None);
        assert_eq!(status.code(), Some(CallStatusCode::Panic));
        let bytes = unsafe { std::mem::take(&mut status.error_buf).into_vec() };
        assert_eq!(bytes, b"core exploded".to_vec());
    }

    #[test]
    fn test_panic_without_message_leaves_buffer_empty() {
        let mut status = CallStatus::default();
        let _: Option<u8> = rust_call(&mut status, || std::panic::panic_any(17u32));
        assert_eq!(status.code(), Some(CallStatusCode::Panic));
        assert!(status.error_buf.is_null());
    }

    #[test]
    fn test_canonical_members() {
        let jwk = JwkData {
            alg: Some("ES256K".to_string()),
            kty: "EC".to_string(),
            crv: "secp256k1".to_string(),
            d: None,
            x: "X".to_string(),
            y: Some("Y".to_string()),
        };
        assert_eq!(
            canonical_members(&jwk),
            r#"{"crv":"secp256k1","kty":"EC","x":"X","y":"Y"}"#
        );
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
