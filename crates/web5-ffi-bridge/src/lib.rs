//! Host-side runtime for the web5 native core.
//!
//! The native core exposes its API as C-ABI entry points that exchange
//! wire-encoded byte buffers and opaque object addresses. This crate is the
//! host half of that boundary:
//!
//! - [`NativeCore`] holds the fixed entry points of one loaded library and
//!   verifies its contract version and checksums at startup
//! - [`NativeCore::call`] and [`NativeCore::call_with_error`] run one call
//!   through the status envelope
//! - [`Handle`] owns a native object and frees it exactly once, after the
//!   last in-flight call
//! - [`Callbacks`] and the `web5_foreign_*` exports let the native core call
//!   back into host implementations of [`SignerCallback`] and
//!   [`KeyManagerCallback`]
//! - [`Signer`], [`KeyManager`] and [`compute_thumbprint`] wrap the
//!   entry points of each object kind
//!
//! ```text
//! host value ──lower──► TransferBuffer ──► native entry point
//!                                              │
//!      ◄──lift── TransferBuffer ◄── CallStatus ┘
//!
//! native core ──id──► web5_foreign_signer_sign ──► Callbacks ──► SignerCallback
//! ```
//!
//! # Faults
//!
//! Domain errors come back as `Result<_, Web5Error>`. A protocol violation
//! (unknown status code, undecodable buffer, contract mismatch, use after
//! destroy) is a [`BridgeFault`], which is logged and raised as a panic.
//!
//! # Safety
//!
//! 1. Buffers cross the boundary with exactly one owner, and each side frees
//!    only what it allocated
//! 2. Object addresses are tagged with their kind and checked before use
//! 3. No call starts on an object once it has been destroyed
//! 4. Panics never unwind across an exported function

mod buffer;
mod call;
mod callback;
mod config;
mod error;
mod fault;
mod handle;
mod kinds;
mod native;
mod objects;
mod status;
mod trampoline;

pub mod loopback;

pub use buffer::{ForeignBytes, OwnedBuffer, TransferBuffer};
pub use callback::{
    dispatch_get_signer, dispatch_import_private_jwk, dispatch_sign, CallbackId, CallbackKind,
    CallbackRegistry, Callbacks, KeyManagerCallback, SignerCallback,
};
pub use config::{BridgeConfig, CallbackConfig, ContractConfig, DEFAULT_CONFIG_PATH};
pub use error::{BridgeError, Result};
pub use fault::{raise, BridgeFault};
pub use handle::{Handle, HandleGuard};
pub use kinds::{KeyManagerKind, ObjectKind, RawObject, SignerKind};
pub use native::{
    BufferFreeFn, BufferFromBytesFn, ChecksumFn, ContractVersionFn, FreeObjectFn, NativeCore,
    NativeCoreBuilder, CONTRACT_VERSION,
};
pub use objects::{
    compute_thumbprint, FromForeignKeyManagerFn, FromForeignSignerFn, GetSignerFn, ImportJwkFn,
    KeyManager, KeyManagerFns, NewObjectFn, SignFn, Signer, SignerFns, ThumbprintFn,
};
pub use status::{CallStatus, CallStatusCode};
pub use trampoline::*;
