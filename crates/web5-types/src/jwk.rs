//! JSON Web Key data and signature algorithm identifiers.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use web5_wire::{wire_enum, wire_record};

/// A JSON Web Key as carried across the boundary.
///
/// The native core treats the key as an opaque bag of base64url members;
/// no validation happens here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JwkData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub kty: String,
    pub crv: String,
    /// Private key material. Absent for public keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

wire_record!(JwkData { alg, kty, crv, d, x, y });

impl JwkData {
    /// Returns true if the key carries private material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Returns a copy with the private member removed.
    pub fn to_public(&self) -> JwkData {
        JwkData {
            d: None,
            ..self.clone()
        }
    }
}

/// Digital signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dsa {
    Ed25519,
}

wire_enum!(Dsa { Ed25519 = 1 });

impl fmt::Display for Dsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dsa::Ed25519 => write!(f, "Ed25519"),
        }
    }
}

impl FromStr for Dsa {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" => Ok(Dsa::Ed25519),
            _ => Err(ParseError::InvalidDsa(s.to_string())),
        }
    }
}
