//! Web5 payload values that cross the native boundary as wire-encoded bytes.
//!
//! Everything here is plain data. None of these types own a native
//! resource; they are produced and consumed entirely by the wire codec:
//!
//! - [`JwkData`], [`Dsa`]: key material and signature algorithms
//! - [`DidData`], [`PortableDidData`]: parsed DID URIs and exportable DIDs
//! - [`DocumentData`] and its parts: DID documents and resolution results
//! - [`VerifiableCredentialData`]: credential payloads
//! - [`Web5Error`]: the domain error carried on the recoverable error path
//!
//! Field order in each type is the wire order. Reordering fields is a
//! breaking change to the boundary contract.

mod credential;
mod did;
mod document;
mod error;
mod jwk;

pub use credential::{VerifiableCredentialCreateOptionsData, VerifiableCredentialData};
pub use did::{DidData, PortableDidData};
pub use document::{
    DocumentData, DocumentMetadataData, ResolutionMetadataData, ResolutionMetadataError,
    ResolutionResultData, ServiceData, VerificationMethodData,
};
pub use error::Web5Error;
pub use jwk::{Dsa, JwkData};

/// Error type for parsing enum names from strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported signature algorithm: {0}")]
    InvalidDsa(String),

    #[error("unknown resolution metadata error: {0}")]
    InvalidResolutionError(String),
}
