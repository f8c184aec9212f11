//! The domain error carried on the recoverable error path.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web5_wire::{CodecError, CodecResult, Wire};

/// Discriminant of the single `Error` variant on the wire.
const ERROR_VARIANT: u32 = 1;

/// An expected failure reported by the native core.
///
/// The native side flattens every domain failure into a kind, a variant
/// within that kind, and a human-readable message. On the wire this is a
/// `u32` variant discriminant (always 1) followed by the three strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub struct Web5Error {
    pub r#type: String,
    pub variant: String,
    pub msg: String,
}

impl Web5Error {
    pub fn new(
        r#type: impl Into<String>,
        variant: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Web5Error {
            r#type: r#type.into(),
            variant: variant.into(),
            msg: msg.into(),
        }
    }

    /// Builds an error raised by host code running inside a callback.
    pub fn host(variant: impl Into<String>, msg: impl Into<String>) -> Self {
        Web5Error::new("HostError", variant, msg)
    }

    pub fn is(&self, r#type: &str, variant: &str) -> bool {
        self.r#type == r#type && self.variant == variant
    }
}

impl fmt::Display for Web5Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error: Type={}, Variant={}, Msg={}",
            self.r#type, self.variant, self.msg
        )
    }
}

impl Wire for Web5Error {
    fn write(&self, buf: &mut Vec<u8>) {
        ERROR_VARIANT.write(buf);
        self.r#type.write(buf);
        self.variant.write(buf);
        self.msg.write(buf);
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        match u32::read(buf)? {
            ERROR_VARIANT => Ok(Web5Error {
                r#type: String::read(buf)?,
                variant: String::read(buf)?,
                msg: String::read(buf)?,
            }),
            other => Err(CodecError::unknown_discriminant("Web5Error", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use web5_wire::{lift, lower};

    #[test]
    fn test_display() {
        let err = Web5Error::new("Jwk", "MissingMember", "x is required");
        assert_eq!(
            err.to_string(),
            "Error: Type=Jwk, Variant=MissingMember, Msg=x is required"
        );
    }

    #[test]
    fn test_wire_layout() {
        let bytes = lower(&Web5Error::new("A", "", "m"));
        assert_eq!(
            bytes,
            vec![0, 0, 0, 1, 0, 0, 0, 1, b'A', 0, 0, 0, 0, 0, 0, 0, 1, b'm']
        );
        assert_eq!(lift::<Web5Error>(&bytes).unwrap(), Web5Error::new("A", "", "m"));
    }

    #[test]
    fn test_unknown_variant() {
        assert_eq!(
            lift::<Web5Error>(&[0, 0, 0, 2]),
            Err(CodecError::unknown_discriminant("Web5Error", 2u32))
        );
    }

    #[test]
    fn test_empty_payload_is_truncated() {
        assert!(matches!(
            lift::<Web5Error>(&[]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_is() {
        let err = Web5Error::host("SignerUnavailable", "gone");
        assert!(err.is("HostError", "SignerUnavailable"));
        assert!(!err.is("HostError", "Other"));
    }
}
