//! Reconciler configuration
//!
//! [`ReconcileConfig`] is plain data: built with `with_*` methods or loaded
//! from a TOML file, then handed to the reconciler for the whole run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether an empty volume type fails the completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTypePolicy {
    /// Empty volume type is accepted
    #[default]
    Lenient,

    /// Empty volume type makes the record incomplete
    Strict,
}

/// Reconciler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Completeness policy for the volume type
    pub volume_type_policy: VolumeTypePolicy,

    /// Remove `ebs_block_device.*` from reconciled instances
    pub strip_instance_devices: bool,
}

impl ReconcileConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With volume type policy
    #[inline]
    #[must_use]
    pub fn with_volume_type_policy(mut self, policy: VolumeTypePolicy) -> Self {
        self.volume_type_policy = policy;
        self
    }

    /// With instance device stripping
    #[inline]
    #[must_use]
    pub fn with_strip_instance_devices(mut self, strip: bool) -> Self {
        self.strip_instance_devices = strip;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the TOML is invalid or has unknown keys
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::InvalidToml)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML, or unknown keys
    #[error("invalid TOML: {0}")]
    InvalidToml(#[from] toml::de::Error),
}
