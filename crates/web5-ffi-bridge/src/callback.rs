//! Registries of host callback implementations.
//!
//! The native core cannot hold host objects directly. Instead, the host
//! registers an implementation and passes its integer ID across; when the
//! native core needs the capability it calls an exported trampoline with
//! that ID, and the trampoline resolves it here.
//!
//! Each [`CallbackKind`] has its own registry and ID sequence. IDs start at
//! 1, increase monotonically, and are never reused. A lookup miss is not an
//! error: a revoked callback simply makes the capability unavailable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};
use web5_types::{JwkData, Web5Error};

use crate::config::CallbackConfig;
use crate::error::{BridgeError, Result};
use crate::fault::{raise, BridgeFault};

/// The capabilities the native core can call back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Signer,
    KeyManager,
}

impl CallbackKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Signer => "signer",
            CallbackKind::KeyManager => "key manager",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key handed to the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(i32);

impl CallbackId {
    pub const fn from_raw(id: i32) -> Self {
        CallbackId(id)
    }

    pub const fn as_raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host signer the native core can invoke.
pub trait SignerCallback: Send + Sync {
    /// Signs `payload`, returning the signature bytes.
    fn sign(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, Web5Error>;
}

impl<F> SignerCallback for F
where
    F: Fn(&[u8]) -> std::result::Result<Vec<u8>, Web5Error> + Send + Sync,
{
    fn sign(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, Web5Error> {
        self(payload)
    }
}

/// A host key manager the native core can invoke.
pub trait KeyManagerCallback: Send + Sync {
    /// Stores a private key, returning its public half.
    fn import_private_jwk(&self, private_jwk: JwkData) -> std::result::Result<JwkData, Web5Error>;

    /// Returns a signer for the private key matching `public_jwk`.
    fn get_signer(
        &self,
        public_jwk: JwkData,
    ) -> std::result::Result<Arc<dyn SignerCallback>, Web5Error>;
}

struct RegistryState<T: ?Sized> {
    last_id: i32,
    entries: HashMap<CallbackId, Arc<T>>,
}

/// ID-keyed store of callback implementations of one kind.
pub struct CallbackRegistry<T: ?Sized> {
    kind: CallbackKind,
    /// 0 means unlimited.
    max_registered: usize,
    state: Mutex<RegistryState<T>>,
}

impl<T: ?Sized> CallbackRegistry<T> {
    pub fn new(kind: CallbackKind) -> Self {
        Self::with_limit(kind, 0)
    }

    /// Creates a registry holding at most `max_registered` entries
    /// (0 for no limit).
    pub fn with_limit(kind: CallbackKind, max_registered: usize) -> Self {
        CallbackRegistry {
            kind,
            max_registered,
            state: Mutex::new(RegistryState {
                last_id: 0,
                entries: HashMap::new(),
            }),
        }
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// Stores `callback` under a fresh ID.
    pub fn register(&self, callback: Arc<T>) -> Result<CallbackId> {
        let mut state = self.state.lock();
        if self.max_registered > 0 && state.entries.len() >= self.max_registered {
            return Err(BridgeError::RegistryFull {
                kind: self.kind,
                limit: self.max_registered,
            });
        }
        if state.last_id == i32::MAX {
            raise(BridgeFault::CallbackIdOverflow {
                kind: self.kind.as_str(),
            });
        }
        state.last_id += 1;
        let id = CallbackId(state.last_id);
        state.entries.insert(id, callback);
        debug!(kind = %self.kind, %id, "registered callback");
        Ok(id)
    }

    /// Returns the callback for `id`, if it is still registered.
    ///
    /// The lock is released before the caller invokes the callback.
    pub fn lookup(&self, id: CallbackId) -> Option<Arc<T>> {
        self.state.lock().entries.get(&id).cloned()
    }

    /// Removes `id`. Returns false if it was not registered.
    ///
    /// The callback is dropped after the lock is released, since dropping
    /// it may free native objects that unregister callbacks of their own.
    pub fn unregister(&self, id: CallbackId) -> bool {
        let removed = self.state.lock().entries.remove(&id);
        match removed {
            Some(_callback) => {
                debug!(kind = %self.kind, %id, "unregistered callback");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CallbackRegistry")
            .field("kind", &self.kind)
            .field("last_id", &state.last_id)
            .field("registered", &state.entries.len())
            .finish()
    }
}

/// The registries for every callback kind.
#[derive(Debug)]
pub struct Callbacks {
    pub signers: CallbackRegistry<dyn SignerCallback>,
    pub key_managers: CallbackRegistry<dyn KeyManagerCallback>,
}

static INSTALLED: OnceCell<Callbacks> = OnceCell::new();

impl Callbacks {
    pub fn new() -> Self {
        Self::from_config(&CallbackConfig::default())
    }

    pub fn from_config(config: &CallbackConfig) -> Self {
        Callbacks {
            signers: CallbackRegistry::with_limit(CallbackKind::Signer, config.max_registered),
            key_managers: CallbackRegistry::with_limit(
                CallbackKind::KeyManager,
                config.max_registered,
            ),
        }
    }

    pub fn register_signer(&self, signer: impl SignerCallback + 'static) -> Result<CallbackId> {
        self.signers.register(Arc::new(signer))
    }

    pub fn register_key_manager(
        &self,
        key_manager: impl KeyManagerCallback + 'static,
    ) -> Result<CallbackId> {
        self.key_managers.register(Arc::new(key_manager))
    }

    /// Makes `callbacks` the instance the exported trampolines dispatch to.
    ///
    /// Can succeed once per process.
    pub fn install(callbacks: Callbacks) -> Result<&'static Callbacks> {
        let mut fresh = false;
        let installed = INSTALLED.get_or_init(|| {
            fresh = true;
            callbacks
        });
        if fresh {
            debug!("installed process-wide callbacks");
            Ok(installed)
        } else {
            Err(BridgeError::AlreadyInstalled)
        }
    }

    /// The installed instance, if any.
    pub fn installed() -> Option<&'static Callbacks> {
        INSTALLED.get()
    }

    /// The installed instance, installing a default one if needed.
    pub fn installed_or_default() -> &'static Callbacks {
        INSTALLED.get_or_init(Callbacks::new)
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the signer registered as `id`.
///
/// Returns `None` if the signer is gone or fails.
pub fn dispatch_sign(callbacks: &Callbacks, id: CallbackId, payload: &[u8]) -> Option<Vec<u8>> {
    let Some(signer) = callbacks.signers.lookup(id) else {
        warn!(kind = "signer", %id, "callback not registered");
        return None;
    };
    match signer.sign(payload) {
        Ok(signature) => Some(signature),
        Err(e) => {
            debug!(kind = "signer", %id, error = %e, "callback failed");
            None
        }
    }
}

/// Runs `import_private_jwk` on the key manager registered as `id`.
pub fn dispatch_import_private_jwk(
    callbacks: &Callbacks,
    id: CallbackId,
    private_jwk: JwkData,
) -> Option<JwkData> {
    let Some(key_manager) = callbacks.key_managers.lookup(id) else {
        warn!(kind = "key manager", %id, "callback not registered");
        return None;
    };
    match key_manager.import_private_jwk(private_jwk) {
        Ok(public_jwk) => Some(public_jwk),
        Err(e) => {
            debug!(kind = "key manager", %id, error = %e, "import_private_jwk failed");
            None
        }
    }
}

/// Runs `get_signer` on the key manager registered as `id` and registers
/// the returned signer.
///
/// Returns the new signer's ID.
pub fn dispatch_get_signer(
    callbacks: &Callbacks,
    id: CallbackId,
    public_jwk: JwkData,
) -> Option<CallbackId> {
    let Some(key_manager) = callbacks.key_managers.lookup(id) else {
        warn!(kind = "key manager", %id, "callback not registered");
        return None;
    };
    let signer = match key_manager.get_signer(public_jwk) {
        Ok(signer) => signer,
        Err(e) => {
            debug!(kind = "key manager", %id, error = %e, "get_signer failed");
            return None;
        }
    };
    match callbacks.signers.register(signer) {
        Ok(signer_id) => Some(signer_id),
        Err(e) => {
            warn!(kind = "key manager", %id, error = %e, "could not register signer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixed_signer(tag: u8) -> impl SignerCallback {
        move |payload: &[u8]| -> std::result::Result<Vec<u8>, Web5Error> {
            let mut signature = vec![tag];
            signature.extend_from_slice(payload);
            Ok(signature)
        }
    }

    struct StaticKeys;

    impl KeyManagerCallback for StaticKeys {
        fn import_private_jwk(
            &self,
            private_jwk: JwkData,
        ) -> std::result::Result<JwkData, Web5Error> {
            Ok(private_jwk.to_public())
        }

        fn get_signer(
            &self,
            public_jwk: JwkData,
        ) -> std::result::Result<Arc<dyn SignerCallback>, Web5Error> {
            if public_jwk.x.is_empty() {
                return Err(Web5Error::new("KeyManager", "NotFound", "no such key"));
            }
            Ok(Arc::new(fixed_signer(9)))
        }
    }

    fn jwk(x: &str, d: Option<&str>) -> JwkData {
        JwkData {
            alg: Some("Ed25519".to_string()),
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            d: d.map(str::to_string),
            x: x.to_string(),
            y: None,
        }
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let registry: CallbackRegistry<dyn SignerCallback> =
            CallbackRegistry::new(CallbackKind::Signer);
        let a = registry.register(Arc::new(fixed_signer(1))).unwrap();
        let b = registry.register(Arc::new(fixed_signer(2))).unwrap();
        assert_eq!((a.as_raw(), b.as_raw()), (1, 2));
        assert!(registry.unregister(b));
        assert!(!registry.unregister(b));
        let c = registry.register(Arc::new(fixed_signer(3))).unwrap();
        assert_eq!(c.as_raw(), 3);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_kinds_have_separate_sequences() {
        let callbacks = Callbacks::new();
        let signer = callbacks.register_signer(fixed_signer(1)).unwrap();
        let manager = callbacks.register_key_manager(StaticKeys).unwrap();
        assert_eq!(signer, CallbackId::from_raw(1));
        assert_eq!(manager, CallbackId::from_raw(1));
    }

    #[test]
    fn test_sign_routes_to_registered_signer_then_revokes() {
        let callbacks = Callbacks::new();
        for tag in 1..=6 {
            callbacks.register_signer(fixed_signer(tag)).unwrap();
        }
        let id = callbacks
            .register_signer(|_: &[u8]| -> std::result::Result<Vec<u8>, Web5Error> {
                Ok(b"sig-of-hello".to_vec())
            })
            .unwrap();
        assert_eq!(id.as_raw(), 7);

        assert_eq!(
            dispatch_sign(&callbacks, id, b"hello"),
            Some(b"sig-of-hello".to_vec())
        );

        assert!(callbacks.signers.unregister(id));
        assert_eq!(dispatch_sign(&callbacks, id, b"hello"), None);
    }

    #[test]
    fn test_unknown_id_is_unavailable() {
        let callbacks = Callbacks::new();
        assert_eq!(dispatch_sign(&callbacks, CallbackId::from_raw(42), b"x"), None);
        assert_eq!(
            dispatch_import_private_jwk(&callbacks, CallbackId::from_raw(1), jwk("x", Some("d"))),
            None
        );
    }

    #[test]
    fn test_failing_signer_is_unavailable() {
        let callbacks = Callbacks::new();
        let id = callbacks
            .register_signer(|_: &[u8]| -> std::result::Result<Vec<u8>, Web5Error> {
                Err(Web5Error::new("Signer", "Locked", "hardware key locked"))
            })
            .unwrap();
        assert_eq!(dispatch_sign(&callbacks, id, b"payload"), None);
    }

    #[test]
    fn test_key_manager_dispatch() {
        let callbacks = Callbacks::new();
        let id = callbacks.register_key_manager(StaticKeys).unwrap();

        let public = dispatch_import_private_jwk(&callbacks, id, jwk("abc", Some("secret")));
        assert_eq!(public, Some(jwk("abc", None)));

        let signer_id = dispatch_get_signer(&callbacks, id, jwk("abc", None)).unwrap();
        assert_eq!(callbacks.signers.len(), 1);
        assert_eq!(
            dispatch_sign(&callbacks, signer_id, b"hi"),
            Some(vec![9, b'h', b'i'])
        );

        assert_eq!(dispatch_get_signer(&callbacks, id, jwk("", None)), None);
    }

    #[test]
    fn test_registry_limit() {
        let callbacks = Callbacks::from_config(&CallbackConfig { max_registered: 1 });
        callbacks.register_signer(fixed_signer(1)).unwrap();
        let err = callbacks.register_signer(fixed_signer(2)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RegistryFull {
                kind: CallbackKind::Signer,
                limit: 1
            }
        ));
    }

    #[test]
    #[should_panic(expected = "signer callback id space exhausted")]
    fn test_id_overflow_is_fatal() {
        let registry: CallbackRegistry<dyn SignerCallback> =
            CallbackRegistry::new(CallbackKind::Signer);
        registry.state.lock().last_id = i32::MAX;
        let _ = registry.register(Arc::new(fixed_signer(1)));
    }

    #[test]
    fn test_install_twice_fails() {
        let first = Callbacks::installed_or_default();
        assert!(std::ptr::eq(first, Callbacks::installed_or_default()));
        assert!(matches!(
            Callbacks::install(Callbacks::new()),
            Err(BridgeError::AlreadyInstalled)
        ));
    }
}
