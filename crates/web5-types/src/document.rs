//! DID documents and resolution results.

use crate::{JwkData, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use web5_wire::{wire_enum, wire_record};

/// A DID document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    pub id: String,
    #[serde(rename = "@context")]
    pub context: Option<Vec<String>>,
    pub controller: Option<Vec<String>>,
    pub also_known_as: Option<Vec<String>>,
    pub verification_method: Vec<VerificationMethodData>,
    pub authentication: Option<Vec<String>>,
    pub assertion_method: Option<Vec<String>>,
    pub key_agreement: Option<Vec<String>>,
    pub capability_invocation: Option<Vec<String>>,
    pub capability_delegation: Option<Vec<String>>,
    pub service: Option<Vec<ServiceData>>,
}

wire_record!(DocumentData {
    id,
    context,
    controller,
    also_known_as,
    verification_method,
    authentication,
    assertion_method,
    key_agreement,
    capability_invocation,
    capability_delegation,
    service,
});

impl DocumentData {
    /// Finds a verification method by its full id.
    pub fn find_verification_method(&self, id: &str) -> Option<&VerificationMethodData> {
        self.verification_method.iter().find(|vm| vm.id == id)
    }
}

/// One verification method entry of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethodData {
    pub id: String,
    pub r#type: String,
    pub controller: String,
    pub public_key_jwk: JwkData,
}

wire_record!(VerificationMethodData {
    id,
    r#type,
    controller,
    public_key_jwk,
});

/// One service entry of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceData {
    pub id: String,
    pub r#type: String,
    pub service_endpoint: Vec<String>,
}

wire_record!(ServiceData {
    id,
    r#type,
    service_endpoint,
});

/// Metadata about a resolved document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadataData {
    pub created: Option<String>,
    pub updated: Option<String>,
    pub deactivated: Option<bool>,
    pub next_update: Option<String>,
    pub version_id: Option<String>,
    pub next_version_id: Option<String>,
    pub equivalent_id: Option<Vec<String>>,
    pub canonical_id: Option<String>,
}

wire_record!(DocumentMetadataData {
    created,
    updated,
    deactivated,
    next_update,
    version_id,
    next_version_id,
    equivalent_id,
    canonical_id,
});

/// Why a resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionMetadataError {
    InvalidDid,
    NotFound,
    RepresentationNotSupported,
    MethodNotSupported,
    InvalidDidDocument,
    InvalidPublicKey,
    InvalidDidDocumentLength,
    InternalError,
}

wire_enum!(ResolutionMetadataError {
    InvalidDid = 1,
    NotFound = 2,
    RepresentationNotSupported = 3,
    MethodNotSupported = 4,
    InvalidDidDocument = 5,
    InvalidPublicKey = 6,
    InvalidDidDocumentLength = 7,
    InternalError = 8,
});

impl ResolutionMetadataError {
    /// Returns the registry name used in resolution metadata.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResolutionMetadataError::InvalidDid => "invalidDid",
            ResolutionMetadataError::NotFound => "notFound",
            ResolutionMetadataError::RepresentationNotSupported => "representationNotSupported",
            ResolutionMetadataError::MethodNotSupported => "methodNotSupported",
            ResolutionMetadataError::InvalidDidDocument => "invalidDidDocument",
            ResolutionMetadataError::InvalidPublicKey => "invalidPublicKey",
            ResolutionMetadataError::InvalidDidDocumentLength => "invalidDidDocumentLength",
            ResolutionMetadataError::InternalError => "internalError",
        }
    }
}

impl fmt::Display for ResolutionMetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionMetadataError {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalidDid" => Ok(ResolutionMetadataError::InvalidDid),
            "notFound" => Ok(ResolutionMetadataError::NotFound),
            "representationNotSupported" => Ok(ResolutionMetadataError::RepresentationNotSupported),
            "methodNotSupported" => Ok(ResolutionMetadataError::MethodNotSupported),
            "invalidDidDocument" => Ok(ResolutionMetadataError::InvalidDidDocument),
            "invalidPublicKey" => Ok(ResolutionMetadataError::InvalidPublicKey),
            "invalidDidDocumentLength" => Ok(ResolutionMetadataError::InvalidDidDocumentLength),
            "internalError" => Ok(ResolutionMetadataError::InternalError),
            _ => Err(ParseError::InvalidResolutionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMetadataData {
    pub error: Option<ResolutionMetadataError>,
}

wire_record!(ResolutionMetadataData { error });

/// The outcome of resolving a DID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResultData {
    pub document: Option<DocumentData>,
    pub document_metadata: Option<DocumentMetadataData>,
    pub resolution_metadata: ResolutionMetadataData,
}

wire_record!(ResolutionResultData {
    document,
    document_metadata,
    resolution_metadata,
});

impl ResolutionResultData {
    /// Builds a failed result carrying only the error.
    pub fn from_error(error: ResolutionMetadataError) -> Self {
        ResolutionResultData {
            document: None,
            document_metadata: None,
            resolution_metadata: ResolutionMetadataData { error: Some(error) },
        }
    }

    pub fn is_success(&self) -> bool {
        self.resolution_metadata.error.is_none() && self.document.is_some()
    }
}
