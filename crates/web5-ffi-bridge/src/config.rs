//! Bridge configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty or missing file
//! yields the contract these bindings were generated against.
//!
//! ```toml
//! [contract]
//! namespace = "web5"
//! version = 24
//!
//! [contract.checksums]
//! method_signer_sign = 43601
//!
//! [callbacks]
//! max_registered = 0
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::native::CONTRACT_VERSION;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/web5/bridge.toml";

/// What the loaded native library must match at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Symbol namespace of the native library
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Expected contract version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Expected checksum per entry point
    #[serde(default = "default_checksums")]
    pub checksums: BTreeMap<String, u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Maximum live registrations per callback kind; 0 for no limit
    #[serde(default)]
    pub max_registered: usize,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub callbacks: CallbackConfig,
}

fn default_namespace() -> String {
    "web5".to_string()
}

fn default_version() -> u32 {
    CONTRACT_VERSION
}

fn default_checksums() -> BTreeMap<String, u16> {
    [
        ("method_signer_sign", 43601),
        ("constructor_inmemorykeymanager_new", 11548),
        ("method_inmemorykeymanager_import_private_jwk", 24698),
        ("method_inmemorykeymanager_get_signer", 36296),
    ]
    .into_iter()
    .map(|(name, checksum)| (name.to_string(), checksum))
    .collect()
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            version: default_version(),
            checksums: default_checksums(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from file, falling back to defaults if the file
    /// does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content).map_err(|e| {
                    BridgeError::Configuration(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    /// Load from the default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BridgeError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract.namespace.is_empty() {
            return Err(BridgeError::Configuration(
                "namespace must not be empty".to_string(),
            ));
        }

        if self.contract.version == 0 {
            return Err(BridgeError::Configuration(
                "contract version must be > 0".to_string(),
            ));
        }

        if self.contract.checksums.keys().any(|name| name.is_empty()) {
            return Err(BridgeError::Configuration(
                "checksum entries must name an entry point".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.contract.namespace, "web5");
        assert_eq!(config.contract.version, 24);
        assert_eq!(config.contract.checksums.len(), 4);
        assert_eq!(config.contract.checksums["method_signer_sign"], 43601);
        assert_eq!(config.callbacks.max_registered, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[callbacks]\nmax_registered = 16").unwrap();

        let config = BridgeConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.callbacks.max_registered, 16);
        assert_eq!(config.contract, ContractConfig::default());
    }

    #[test]
    fn test_checksum_table_replaces_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[contract]\nversion = 25\n\n[contract.checksums]\nmethod_signer_sign = 1"
        )
        .unwrap();

        let config = BridgeConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.contract.version, 25);
        assert_eq!(config.contract.namespace, "web5");
        assert_eq!(
            config.contract.checksums,
            BTreeMap::from([("method_signer_sign".to_string(), 1)])
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[contract\nversion = ").unwrap();

        let err = BridgeConfig::load_or_default(file.path()).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        let mut config = BridgeConfig::default();
        config.callbacks.max_registered = 3;
        config.save(&path).unwrap();

        assert_eq!(BridgeConfig::load_or_default(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_empty_namespace() {
        let mut config = BridgeConfig::default();
        config.contract.namespace.clear();
        assert!(matches!(
            config.validate(),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_version() {
        let mut config = BridgeConfig::default();
        config.contract.version = 0;
        assert!(config.validate().is_err());
    }
}
