//! Terraform resource state records
//!
//! Mirrors the per-resource object of a version 3 state file. Fields this
//! tool does not interpret are kept in `extra` so that a resource read from
//! disk serializes back unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource map of one state module, keyed by resource address
pub type ResourceMap = BTreeMap<String, ResourceState>;

/// One resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type, e.g. `aws_instance`
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Explicit dependencies
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Primary instance
    pub primary: InstanceState,

    /// Deposed instances (opaque)
    #[serde(default)]
    pub deposed: Vec<Value>,

    /// Provider name
    #[serde(default)]
    pub provider: String,

    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceState {
    /// Create a resource with a primary instance and nothing else
    #[must_use]
    pub fn new(resource_type: impl Into<String>, primary: InstanceState) -> Self {
        Self {
            resource_type: resource_type.into(),
            depends_on: Vec::new(),
            primary,
            deposed: Vec::new(),
            provider: String::new(),
            extra: Map::new(),
        }
    }

    /// Primary instance ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.primary.id
    }

    /// Flattened attributes of the primary instance
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.primary.attributes
    }
}

/// Primary (or deposed) instance of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Remote object ID
    pub id: String,

    /// Flattened attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Provider metadata
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// Whether the instance is tainted
    #[serde(default)]
    pub tainted: bool,

    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceState {
    /// Create an instance with an ID and attributes
    #[must_use]
    pub fn new(id: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            attributes,
            ..Self::default()
        }
    }
}
