//! Host wrappers for native objects.
//!
//! Each wrapper pairs a [`Handle`] with the function table of its kind and
//! runs every method as acquire, lower, call, lift, release.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use web5_types::{JwkData, Web5Error};
use web5_wire::ByteArray;

use crate::buffer::TransferBuffer;
use crate::callback::{Callbacks, KeyManagerCallback, SignerCallback};
use crate::error::BridgeError;
use crate::handle::Handle;
use crate::kinds::{KeyManagerKind, RawObject, SignerKind};
use crate::native::{FreeObjectFn, NativeCore};
use crate::status::CallStatus;
use crate::trampoline::{
    web5_foreign_key_manager_free, web5_foreign_signer_free, ForeignKeyManager, ForeignSigner,
};

pub type SignFn =
    unsafe extern "C" fn(*mut c_void, TransferBuffer, *mut CallStatus) -> TransferBuffer;
pub type NewObjectFn = unsafe extern "C" fn(*mut CallStatus) -> *mut c_void;
pub type ImportJwkFn =
    unsafe extern "C" fn(*mut c_void, TransferBuffer, *mut CallStatus) -> TransferBuffer;
pub type GetSignerFn =
    unsafe extern "C" fn(*mut c_void, TransferBuffer, *mut CallStatus) -> *mut c_void;
/// Wraps a host signer vtable in a native signer object.
pub type FromForeignSignerFn =
    unsafe extern "C" fn(*mut ForeignSigner, *mut CallStatus) -> *mut c_void;
/// Wraps a host key manager vtable in a native key manager object.
pub type FromForeignKeyManagerFn =
    unsafe extern "C" fn(*mut ForeignKeyManager, *mut CallStatus) -> *mut c_void;
pub type ThumbprintFn = unsafe extern "C" fn(TransferBuffer, *mut CallStatus) -> TransferBuffer;

/// Entry points of the native signer kind.
#[derive(Debug, Clone, Copy)]
pub struct SignerFns {
    pub sign: SignFn,
    pub free: FreeObjectFn,
    /// Absent if the library cannot wrap host signers.
    pub from_foreign: Option<FromForeignSignerFn>,
}

/// Entry points of the native key manager kind.
#[derive(Debug, Clone, Copy)]
pub struct KeyManagerFns {
    pub new: NewObjectFn,
    pub from_foreign: Option<FromForeignKeyManagerFn>,
    pub import_private_jwk: ImportJwkFn,
    pub get_signer: GetSignerFn,
    pub free: FreeObjectFn,
    /// Table for the signers `get_signer` returns.
    pub signer: SignerFns,
}

/// A vtable handed to a `from_foreign` constructor.
///
/// The native side owns the vtable only once it returns a live object.
/// Until [`PendingVtable::handed_over`] runs, dropping this releases the
/// vtable and the callback registration behind it, including while a fault
/// unwinds.
struct PendingVtable<T> {
    vtable: *mut T,
    release: unsafe extern "C" fn(*mut T),
}

impl<T> PendingVtable<T> {
    fn new(vtable: *mut T, release: unsafe extern "C" fn(*mut T)) -> Self {
        PendingVtable { vtable, release }
    }

    fn as_ptr(&self) -> *mut T {
        self.vtable
    }

    fn handed_over(mut self) {
        self.vtable = std::ptr::null_mut();
    }
}

impl<T> Drop for PendingVtable<T> {
    fn drop(&mut self) {
        if !self.vtable.is_null() {
            // SAFETY: the vtable came from `into_raw` and the native side
            // never took it.
            unsafe { (self.release)(self.vtable) }
        }
    }
}

/// A native signer.
pub struct Signer {
    core: Arc<NativeCore>,
    fns: SignerFns,
    handle: Handle<SignerKind>,
}

impl Signer {
    /// Takes ownership of a signer object returned by the native core.
    pub fn adopt(core: Arc<NativeCore>, fns: SignerFns, raw: RawObject) -> Self {
        let handle = Handle::adopt(core.clone(), raw, fns.free);
        Signer { core, fns, handle }
    }

    /// Registers a host signer and wraps it in a native signer object.
    ///
    /// The registration lives until the native object is freed.
    pub fn from_foreign(
        core: Arc<NativeCore>,
        fns: SignerFns,
        signer: impl SignerCallback + 'static,
    ) -> Result<Self, BridgeError> {
        let Some(from_foreign) = fns.from_foreign else {
            return Err(BridgeError::Unsupported("host signers"));
        };
        let id = Callbacks::installed_or_default().register_signer(signer)?;
        let vtable =
            PendingVtable::new(ForeignSigner::new(id).into_raw(), web5_foreign_signer_free);
        // SAFETY: the native side takes ownership of the vtable on success.
        let address = core.call(|status| unsafe { from_foreign(vtable.as_ptr(), status) });
        let signer = Self::adopt(core, fns, RawObject::new::<SignerKind>(address));
        vtable.handed_over();
        Ok(signer)
    }

    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, Web5Error> {
        let guard = self.handle.acquire();
        let payload = self.core.lower(&ByteArray(payload.to_vec())).into_raw();
        let sign = self.fns.sign;
        // SAFETY: the guard keeps the object alive; `sign` consumes the
        // payload buffer.
        let signature = self
            .core
            .call_with_error::<_, Web5Error>(|status| unsafe {
                sign(guard.as_ptr(), payload, status)
            })?;
        Ok(self.core.lift::<ByteArray>(signature).into_inner())
    }

    /// Frees the native object once in-flight calls finish.
    pub fn destroy(&self) {
        self.handle.destroy();
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("handle", &self.handle).finish()
    }
}

/// A native key manager.
pub struct KeyManager {
    core: Arc<NativeCore>,
    fns: KeyManagerFns,
    handle: Handle<KeyManagerKind>,
}

impl KeyManager {
    /// Constructs the native in-memory key manager.
    pub fn new(core: Arc<NativeCore>, fns: KeyManagerFns) -> Self {
        let new = fns.new;
        // SAFETY: the constructor takes only the status out-parameter.
        let address = core.call(|status| unsafe { new(status) });
        Self::adopt(core, fns, RawObject::new::<KeyManagerKind>(address))
    }

    pub fn adopt(core: Arc<NativeCore>, fns: KeyManagerFns, raw: RawObject) -> Self {
        let handle = Handle::adopt(core.clone(), raw, fns.free);
        KeyManager { core, fns, handle }
    }

    /// Registers a host key manager and wraps it in a native object.
    pub fn from_foreign(
        core: Arc<NativeCore>,
        fns: KeyManagerFns,
        key_manager: impl KeyManagerCallback + 'static,
    ) -> Result<Self, BridgeError> {
        let Some(from_foreign) = fns.from_foreign else {
            return Err(BridgeError::Unsupported("host key managers"));
        };
        let id = Callbacks::installed_or_default().register_key_manager(key_manager)?;
        let vtable = PendingVtable::new(
            ForeignKeyManager::new(id).into_raw(),
            web5_foreign_key_manager_free,
        );
        // SAFETY: the native side takes ownership of the vtable on success.
        let address = core.call(|status| unsafe { from_foreign(vtable.as_ptr(), status) });
        let manager = Self::adopt(core, fns, RawObject::new::<KeyManagerKind>(address));
        vtable.handed_over();
        Ok(manager)
    }

    /// Stores a private key and returns its public half.
    pub fn import_private_jwk(&self, private_jwk: &JwkData) -> Result<JwkData, Web5Error> {
        let guard = self.handle.acquire();
        let arg = self.core.lower(private_jwk).into_raw();
        let import = self.fns.import_private_jwk;
        // SAFETY: as in `Signer::sign`.
        let public_jwk = self
            .core
            .call_with_error::<_, Web5Error>(|status| unsafe {
                import(guard.as_ptr(), arg, status)
            })?;
        Ok(self.core.lift(public_jwk))
    }

    /// Returns a signer for the private key matching `public_jwk`.
    pub fn get_signer(&self, public_jwk: &JwkData) -> Result<Signer, Web5Error> {
        let guard = self.handle.acquire();
        let arg = self.core.lower(public_jwk).into_raw();
        let get_signer = self.fns.get_signer;
        // SAFETY: as in `Signer::sign`.
        let address = self
            .core
            .call_with_error::<_, Web5Error>(|status| unsafe {
                get_signer(guard.as_ptr(), arg, status)
            })?;
        Ok(Signer::adopt(
            self.core.clone(),
            self.fns.signer,
            RawObject::new::<SignerKind>(address),
        ))
    }

    pub fn destroy(&self) {
        self.handle.destroy();
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Computes the RFC 7638 thumbprint of a JWK.
pub fn compute_thumbprint(core: &NativeCore, thumbprint: ThumbprintFn, jwk: &JwkData) -> String {
    let arg = core.lower(jwk).into_raw();
    // SAFETY: `thumbprint` consumes its argument buffer.
    let buf = core.call(|status| unsafe { thumbprint(arg, status) });
    core.lift(buf)
}

#[cfg(feature = "native-link")]
mod linked {
    use super::*;
    use crate::native::linked::*;

    impl SignerFns {
        /// Signer entry points of the linked native library.
        pub fn linked() -> Self {
            SignerFns {
                sign: uniffi_web5_uniffi_fn_method_signer_sign,
                free: uniffi_web5_uniffi_fn_free_signer,
                from_foreign: None,
            }
        }
    }

    impl KeyManagerFns {
        /// Key manager entry points of the linked native library.
        pub fn linked() -> Self {
            KeyManagerFns {
                new: uniffi_web5_uniffi_fn_constructor_inmemorykeymanager_new,
                from_foreign: None,
                import_private_jwk: uniffi_web5_uniffi_fn_method_inmemorykeymanager_import_private_jwk,
                get_signer: uniffi_web5_uniffi_fn_method_inmemorykeymanager_get_signer,
                free: uniffi_web5_uniffi_fn_free_inmemorykeymanager,
                signer: SignerFns::linked(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::loopback;
    use pretty_assertions::assert_eq;

    fn private_jwk(x: &str) -> JwkData {
        JwkData {
            alg: Some("Ed25519".to_string()),
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            d: Some("AQID".to_string()),
            x: x.to_string(),
            y: None,
        }
    }

    #[test]
    fn test_import_then_sign() {
        let core = loopback::core();
        let manager = KeyManager::new(core.clone(), loopback::key_manager_fns());
        let public = manager.import_private_jwk(&private_jwk("key-1")).unwrap();
        assert_eq!(public, private_jwk("key-1").to_public());

        let signer = manager.get_signer(&public).unwrap();
        let signature = signer.sign(b"payload").unwrap();
        assert_eq!(signature.len(), b"payload".len());
        assert_ne!(signature, b"payload".to_vec());
    }

    #[test]
    fn test_domain_errors_are_recoverable() {
        let core = loopback::core();
        let manager = KeyManager::new(core, loopback::key_manager_fns());

        let err = manager
            .import_private_jwk(&private_jwk("key-2").to_public())
            .unwrap_err();
        assert_eq!(err.variant, "MissingPrivateKey");

        let err = manager.get_signer(&private_jwk("unknown").to_public()).unwrap_err();
        assert_eq!(err.variant, "NotFound");

        // The manager is still usable after both errors.
        assert!(manager.import_private_jwk(&private_jwk("key-2")).is_ok());
    }

    #[test]
    fn test_signer_outlives_key_manager() {
        let core = loopback::core();
        let manager = KeyManager::new(core, loopback::key_manager_fns());
        let public = manager.import_private_jwk(&private_jwk("key-3")).unwrap();
        let signer = manager.get_signer(&public).unwrap();
        drop(manager);
        assert!(signer.sign(b"still here").is_ok());
    }

    #[test]
    #[should_panic(expected = "Signer object already destroyed")]
    fn test_sign_after_destroy_is_fatal() {
        let core = loopback::core();
        let manager = KeyManager::new(core, loopback::key_manager_fns());
        let public = manager.import_private_jwk(&private_jwk("key-4")).unwrap();
        let signer = manager.get_signer(&public).unwrap();
        signer.destroy();
        let _ = signer.sign(b"too late");
    }

    #[test]
    fn test_from_foreign_without_entry_point() {
        let core = loopback::core();
        let fns = SignerFns {
            from_foreign: None,
            ..loopback::signer_fns()
        };
        let result = Signer::from_foreign(core, fns, |p: &[u8]| -> Result<Vec<u8>, Web5Error> {
            Ok(p.to_vec())
        });
        assert!(matches!(result, Err(BridgeError::Unsupported(_))));
    }

    unsafe extern "C" fn panicking_from_foreign(
        _vtable: *mut ForeignSigner,
        status: *mut CallStatus,
    ) -> *mut c_void {
        (*status).code = 2;
        std::ptr::null_mut()
    }

    unsafe extern "C" fn null_from_foreign(
        _vtable: *mut ForeignKeyManager,
        _status: *mut CallStatus,
    ) -> *mut c_void {
        std::ptr::null_mut()
    }

    struct NoKeys(Arc<()>);

    impl KeyManagerCallback for NoKeys {
        fn import_private_jwk(&self, _private_jwk: JwkData) -> Result<JwkData, Web5Error> {
            Err(Web5Error::new("KeyManager", "ReadOnly", "no keys"))
        }

        fn get_signer(&self, _public_jwk: JwkData) -> Result<Arc<dyn SignerCallback>, Web5Error> {
            Err(Web5Error::new("KeyManager", "NotFound", "no keys"))
        }
    }

    #[test]
    fn test_faulted_signer_wrap_releases_registration() {
        let core = loopback::core();
        let fns = SignerFns {
            from_foreign: Some(panicking_from_foreign),
            ..loopback::signer_fns()
        };
        let owner = Arc::new(());
        let held = owner.clone();

        let result = catch_unwind(AssertUnwindSafe(|| {
            Signer::from_foreign(core, fns, move |p: &[u8]| -> Result<Vec<u8>, Web5Error> {
                let _ = &held;
                Ok(p.to_vec())
            })
        }));
        assert!(result.is_err());
        assert_eq!(Arc::strong_count(&owner), 1);
    }

    #[test]
    fn test_null_key_manager_wrap_releases_registration() {
        let core = loopback::core();
        let fns = KeyManagerFns {
            from_foreign: Some(null_from_foreign),
            ..loopback::key_manager_fns()
        };
        let owner = Arc::new(());
        let keys = NoKeys(owner.clone());

        let result = catch_unwind(AssertUnwindSafe(|| KeyManager::from_foreign(core, fns, keys)));
        assert!(result.is_err());
        assert_eq!(Arc::strong_count(&owner), 1);
    }

    #[test]
    fn test_thumbprint_ignores_private_member() {
        let core = loopback::core();
        let with_private =
            compute_thumbprint(&core, loopback::thumbprint_fn(), &private_jwk("abc"));
        let public_only = compute_thumbprint(
            &core,
            loopback::thumbprint_fn(),
            &private_jwk("abc").to_public(),
        );
        assert_eq!(with_private, public_only);
        assert_eq!(with_private.len(), 16);
        assert_ne!(
            with_private,
            compute_thumbprint(&core, loopback::thumbprint_fn(), &private_jwk("abd"))
        );
    }
}
