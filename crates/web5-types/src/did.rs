//! Parsed DID URIs and portable DIDs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use web5_wire::wire_record;

use crate::{DocumentData, JwkData};

/// A DID URI broken into its components.
///
/// `uri` is the bare DID (`did:<method>:<id>`); `url` is the full input
/// including any params, path, query or fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidData {
    pub uri: String,
    pub url: String,
    pub method: String,
    pub id: String,
    pub params: Option<HashMap<String, String>>,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

wire_record!(DidData {
    uri,
    url,
    method,
    id,
    params,
    path,
    query,
    fragment,
});

impl DidData {
    /// Returns true if the URL addresses something inside the document
    /// rather than the DID itself.
    pub fn is_dereferenceable(&self) -> bool {
        self.fragment.is_some() || self.path.is_some() || self.query.is_some()
    }
}

/// A DID together with its document and private keys, in a form that can
/// be exported and later re-imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableDidData {
    pub did_uri: String,
    pub document: DocumentData,
    pub private_jwks: Vec<JwkData>,
}

wire_record!(PortableDidData {
    did_uri,
    document,
    private_jwks,
});
