//! The fixed entry points of one loaded native core.
//!
//! A [`NativeCore`] is the host's view of a native library: the buffer
//! allocation and free functions every call needs, the contract version
//! function, and the per-entry-point checksum functions checked at startup.
//! Object entry points live in per-kind tables next to their wrappers (see
//! [`crate::objects`]).

use std::collections::HashMap;
use std::ffi::c_void;

use tracing::debug;
use web5_wire::Wire;

use crate::buffer::{ForeignBytes, OwnedBuffer, TransferBuffer};
use crate::config::ContractConfig;
use crate::fault::{raise, BridgeFault};
use crate::status::CallStatus;

/// Contract version these bindings were generated against.
pub const CONTRACT_VERSION: u32 = 24;

/// Copies foreign bytes into a newly allocated native buffer.
pub type BufferFromBytesFn = unsafe extern "C" fn(ForeignBytes, *mut CallStatus) -> TransferBuffer;
/// Frees a buffer the native side allocated.
pub type BufferFreeFn = unsafe extern "C" fn(TransferBuffer, *mut CallStatus);
pub type ContractVersionFn = unsafe extern "C" fn(*mut CallStatus) -> u32;
pub type ChecksumFn = unsafe extern "C" fn(*mut CallStatus) -> u16;
/// Frees one native object.
pub type FreeObjectFn = unsafe extern "C" fn(*mut c_void, *mut CallStatus);

/// Function table for a loaded native library.
pub struct NativeCore {
    namespace: String,
    buffer_from_bytes: BufferFromBytesFn,
    buffer_free: BufferFreeFn,
    contract_version: ContractVersionFn,
    checksums: HashMap<String, ChecksumFn>,
}

/// Builder for [`NativeCore`].
pub struct NativeCoreBuilder {
    core: NativeCore,
}

impl NativeCoreBuilder {
    /// Registers the checksum function for one entry point.
    pub fn checksum(mut self, function: impl Into<String>, checksum: ChecksumFn) -> Self {
        self.core.checksums.insert(function.into(), checksum);
        self
    }

    pub fn build(self) -> NativeCore {
        self.core
    }
}

impl NativeCore {
    pub fn builder(
        namespace: impl Into<String>,
        buffer_from_bytes: BufferFromBytesFn,
        buffer_free: BufferFreeFn,
        contract_version: ContractVersionFn,
    ) -> NativeCoreBuilder {
        NativeCoreBuilder {
            core: NativeCore {
                namespace: namespace.into(),
                buffer_from_bytes,
                buffer_free,
                contract_version,
                checksums: HashMap::new(),
            },
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Asks the library which contract version it was built for.
    pub fn contract_version(&self) -> u32 {
        let f = self.contract_version;
        // SAFETY: the function takes only the status out-parameter.
        self.call(|status| unsafe { f(status) })
    }

    /// Returns the library's checksum for `function`, if it exports one.
    pub fn checksum(&self, function: &str) -> Option<u16> {
        let f = *self.checksums.get(function)?;
        // SAFETY: as above.
        Some(self.call(|status| unsafe { f(status) }))
    }

    /// Checks the library against the contract the bindings expect.
    ///
    /// Any mismatch means the two sides were built from different schema
    /// revisions and is raised as a fault.
    pub fn verify_contract(&self, contract: &ContractConfig) {
        if self.namespace != contract.namespace {
            raise(BridgeFault::NamespaceMismatch {
                expected: contract.namespace.clone(),
                actual: self.namespace.clone(),
            });
        }

        let actual = self.contract_version();
        if actual != contract.version {
            raise(BridgeFault::ContractVersionMismatch {
                expected: contract.version,
                actual,
            });
        }

        for (function, &expected) in &contract.checksums {
            let Some(actual) = self.checksum(function) else {
                raise(BridgeFault::MissingChecksum(function.clone()))
            };
            if actual != expected {
                raise(BridgeFault::ChecksumMismatch {
                    function: function.clone(),
                    expected,
                    actual,
                });
            }
        }

        debug!(
            namespace = %self.namespace,
            version = actual,
            checksums = contract.checksums.len(),
            "native contract verified"
        );
    }

    /// Copies bytes into a native buffer.
    ///
    /// Empty input yields the null buffer without calling native.
    pub fn lower_bytes(&self, bytes: &[u8]) -> OwnedBuffer<'_> {
        if bytes.is_empty() {
            return OwnedBuffer::new(self, TransferBuffer::empty());
        }
        let foreign = ForeignBytes::from_slice(bytes);
        let f = self.buffer_from_bytes;
        // SAFETY: `foreign` borrows `bytes`, which outlives the call; the
        // native side copies it.
        let buf = self.call(|status| unsafe { f(foreign, status) });
        OwnedBuffer::new(self, buf)
    }

    /// Encodes a value into a native buffer.
    pub fn lower<T: Wire>(&self, value: &T) -> OwnedBuffer<'_> {
        self.lower_bytes(&web5_wire::lower(value))
    }

    /// Decodes and frees a buffer returned by the native side.
    ///
    /// A decode failure is a fault; the buffer is freed either way.
    pub fn lift<T: Wire>(&self, buf: TransferBuffer) -> T {
        let owned = OwnedBuffer::new(self, buf);
        match web5_wire::lift::<T>(owned.as_slice()) {
            Ok(value) => value,
            Err(source) => raise(BridgeFault::lift::<T>(source)),
        }
    }

    /// Returns a native buffer to the native allocator.
    pub fn free_buffer(&self, buf: TransferBuffer) {
        let f = self.buffer_free;
        // SAFETY: ownership of `buf` moves to the native side.
        self.call(|status| unsafe { f(buf, status) })
    }
}

impl std::fmt::Debug for NativeCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut functions: Vec<_> = self.checksums.keys().collect();
        functions.sort();
        f.debug_struct("NativeCore")
            .field("namespace", &self.namespace)
            .field("checksums", &functions)
            .finish()
    }
}

#[cfg(feature = "native-link")]
pub(crate) mod linked {
    //! Symbols of the real native library.

    use super::*;

    extern "C" {
        fn ffi_web5_uniffi_rustbuffer_from_bytes(
            bytes: ForeignBytes,
            status: *mut CallStatus,
        ) -> TransferBuffer;
        fn ffi_web5_uniffi_rustbuffer_free(buf: TransferBuffer, status: *mut CallStatus);
        fn ffi_web5_uniffi_uniffi_contract_version(status: *mut CallStatus) -> u32;

        fn uniffi_web5_uniffi_checksum_method_signer_sign(status: *mut CallStatus) -> u16;
        fn uniffi_web5_uniffi_checksum_constructor_inmemorykeymanager_new(
            status: *mut CallStatus,
        ) -> u16;
        fn uniffi_web5_uniffi_checksum_method_inmemorykeymanager_import_private_jwk(
            status: *mut CallStatus,
        ) -> u16;
        fn uniffi_web5_uniffi_checksum_method_inmemorykeymanager_get_signer(
            status: *mut CallStatus,
        ) -> u16;

        pub(crate) fn uniffi_web5_uniffi_fn_method_signer_sign(
            signer: *mut c_void,
            payload: TransferBuffer,
            status: *mut CallStatus,
        ) -> TransferBuffer;
        pub(crate) fn uniffi_web5_uniffi_fn_free_signer(
            signer: *mut c_void,
            status: *mut CallStatus,
        );
        pub(crate) fn uniffi_web5_uniffi_fn_constructor_inmemorykeymanager_new(
            status: *mut CallStatus,
        ) -> *mut c_void;
        pub(crate) fn uniffi_web5_uniffi_fn_method_inmemorykeymanager_import_private_jwk(
            manager: *mut c_void,
            private_jwk: TransferBuffer,
            status: *mut CallStatus,
        ) -> TransferBuffer;
        pub(crate) fn uniffi_web5_uniffi_fn_method_inmemorykeymanager_get_signer(
            manager: *mut c_void,
            public_jwk: TransferBuffer,
            status: *mut CallStatus,
        ) -> *mut c_void;
        pub(crate) fn uniffi_web5_uniffi_fn_free_inmemorykeymanager(
            manager: *mut c_void,
            status: *mut CallStatus,
        );
    }

    impl NativeCore {
        /// The function table of the linked native library.
        pub fn linked() -> NativeCore {
            NativeCore::builder(
                "web5",
                ffi_web5_uniffi_rustbuffer_from_bytes,
                ffi_web5_uniffi_rustbuffer_free,
                ffi_web5_uniffi_uniffi_contract_version,
            )
            .checksum(
                "method_signer_sign",
                uniffi_web5_uniffi_checksum_method_signer_sign,
            )
            .checksum(
                "constructor_inmemorykeymanager_new",
                uniffi_web5_uniffi_checksum_constructor_inmemorykeymanager_new,
            )
            .checksum(
                "method_inmemorykeymanager_import_private_jwk",
                uniffi_web5_uniffi_checksum_method_inmemorykeymanager_import_private_jwk,
            )
            .checksum(
                "method_inmemorykeymanager_get_signer",
                uniffi_web5_uniffi_checksum_method_inmemorykeymanager_get_signer,
            )
            .build()
        }
    }
}
