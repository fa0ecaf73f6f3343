//! volatt Inventory
//!
//! Builds the instance inventory from an EC2 `DescribeInstances` response,
//! as saved by `aws ec2 describe-instances > inventory.json`.
//!
//! # Core Concepts
//!
//! - [`InventorySource`]: Anything that can produce an [`InventoryMap`]
//! - [`DescribeInstancesFile`]: A saved response on disk
//! - [`NameFilter`]: `Name` tag filter with `*` wildcards, matching the
//!   `tag:Name` filter EC2 applies server-side

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod describe;
mod filter;

use std::path::{Path, PathBuf};

pub use describe::{
    BlockDeviceMapping, DescribeInstancesDocument, EbsDevice, Ec2Instance, Placement, Reservation, Tag, NAME_TAG,
};
pub use filter::NameFilter;
pub use volatt_core::{Instance, InventoryMap};

/// Source of inventory data
pub trait InventorySource {
    /// Collect instances keyed by instance ID
    ///
    /// # Errors
    /// Returns error if the inventory cannot be read or understood
    fn instances(&self) -> Result<InventoryMap, InventoryError>;
}

/// A `DescribeInstances` response saved to a file
#[derive(Debug, Clone)]
pub struct DescribeInstancesFile {
    path: PathBuf,
    filter: Option<NameFilter>,
}

impl DescribeInstancesFile {
    /// Read every instance in the file
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: None,
        }
    }

    /// Only keep instances whose `Name` tag matches
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: NameFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Path of the response file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InventorySource for DescribeInstancesFile {
    fn instances(&self) -> Result<InventoryMap, InventoryError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| InventoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document = DescribeInstancesDocument::from_json(&json)?;
        let instances = document.to_inventory(self.filter.as_ref());
        tracing::info!("Loaded {} instance(s) from {}", instances.len(), self.path.display());
        Ok(instances)
    }
}

/// Inventory errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// IO error reading the response
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Response is not valid `DescribeInstances` JSON
    #[error("invalid DescribeInstances JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Name pattern cannot be compiled
    #[error("invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
