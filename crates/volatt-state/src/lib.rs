//! volatt State
//!
//! Reads and writes Terraform state files in the version 3 layout
//! (`modules[].resources`), the layout that carries flattened
//! `ebs_block_device` attributes. Fields not modelled here are preserved so
//! that a read/write cycle only changes what reconciliation changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use volatt_state::StateFile;
//!
//! let mut state = StateFile::from_path("terraform.tfstate")?;
//! let resources = state.root_module()?.resources.clone();
//! // ... reconcile ...
//! state.root_module_mut()?.resources = new_resources;
//! state.write_to_path("terraform.tfstate")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use volatt_core::ResourceMap;

/// The only state layout this crate understands
pub const SUPPORTED_VERSION: u64 = 3;

/// Module path of the root module
pub const ROOT_MODULE: &str = "root";

/// A Terraform state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    /// State format version
    pub version: u64,

    /// Terraform version that wrote the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,

    /// Incremented on every write
    #[serde(default)]
    pub serial: u64,

    /// Lineage shared by every serial of this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<String>,

    /// Modules, root first
    #[serde(default)]
    pub modules: Vec<ModuleState>,

    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One module of a state file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Module path, `["root"]` for the root module
    #[serde(default)]
    pub path: Vec<String>,

    /// Module outputs (opaque)
    #[serde(default)]
    pub outputs: Map<String, Value>,

    /// Resources keyed by address
    #[serde(default)]
    pub resources: ResourceMap,

    /// Module dependencies
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModuleState {
    /// Whether this is the root module
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.len() == 1 && self.path[0] == ROOT_MODULE
    }
}

impl StateFile {
    /// Parse state from JSON text
    ///
    /// # Errors
    /// Returns error if the JSON is invalid or the version is not 3
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let state: Self = serde_json::from_str(json)?;
        if state.version != SUPPORTED_VERSION {
            return Err(StateError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }

    /// Read state from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StateError::io(path, e))?;
        let state = Self::from_json(&json)?;
        tracing::debug!(
            "Read state {} (serial {}, {} module(s))",
            path.display(),
            state.serial,
            state.modules.len()
        );
        Ok(state)
    }

    /// The root module
    ///
    /// Falls back to the first module when none is marked root.
    ///
    /// # Errors
    /// Returns [`StateError::NoRootModule`] if the state has no modules
    pub fn root_module(&self) -> Result<&ModuleState, StateError> {
        self.modules
            .iter()
            .find(|m| m.is_root())
            .or_else(|| self.modules.first())
            .ok_or(StateError::NoRootModule)
    }

    /// The root module, mutably
    ///
    /// # Errors
    /// Returns [`StateError::NoRootModule`] if the state has no modules
    pub fn root_module_mut(&mut self) -> Result<&mut ModuleState, StateError> {
        let position = self.modules.iter().position(ModuleState::is_root).unwrap_or(0);
        self.modules.get_mut(position).ok_or(StateError::NoRootModule)
    }

    /// Pretty JSON of the root module's resources
    ///
    /// # Errors
    /// Returns error if there is no root module
    pub fn resources_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(&self.root_module()?.resources)?)
    }

    /// Pretty JSON of the whole state
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bump the serial and write the state to `path`
    ///
    /// The file is written to a temporary file next to `path` and renamed
    /// over it, so readers never see a partial state.
    ///
    /// # Errors
    /// Returns error if serialization or any filesystem operation fails
    pub fn write_to_path(&mut self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        self.serial += 1;
        let mut json = self.to_json()?;
        json.push('\n');

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StateError::io(dir, e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| StateError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| StateError::io(path, e.error))?;

        tracing::info!("Wrote state {} (serial {})", path.display(), self.serial);
        Ok(())
    }
}

/// State file errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// IO error on a state path
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed state JSON
    #[error("invalid state JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Not a version 3 state
    #[error("unsupported state version {0} (expected 3)")]
    UnsupportedVersion(u64),

    /// State has no modules
    #[error("state has no root module")]
    NoRootModule,
}

impl StateError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
