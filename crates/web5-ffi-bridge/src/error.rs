//! Recoverable bridge errors.

use thiserror::Error;

use crate::callback::CallbackKind;

/// Errors the host can handle and continue from.
///
/// Protocol violations are not represented here; see
/// [`BridgeFault`](crate::BridgeFault).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry already holds its configured maximum.
    #[error("{kind} registry is full ({limit} entries)")]
    RegistryFull { kind: CallbackKind, limit: usize },

    #[error("process-wide callbacks are already installed")]
    AlreadyInstalled,

    /// The loaded native core does not provide the entry point.
    #[error("native core does not support {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::Configuration("namespace must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: namespace must not be empty"
        );
    }

    #[test]
    fn test_registry_full_display() {
        let err = BridgeError::RegistryFull {
            kind: CallbackKind::Signer,
            limit: 2,
        };
        assert_eq!(err.to_string(), "signer registry is full (2 entries)");
    }
}
