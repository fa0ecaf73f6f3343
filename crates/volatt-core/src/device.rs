//! Canonical block device names
//!
//! Provides [`DeviceName`], the merge key between inventory devices and
//! devices recovered from state. EC2 reports `/dev/xvdb`, Terraform configs
//! frequently say `xvdb`; both map to the same name.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Prefix every canonical device name carries
pub const DEVICE_PREFIX: &str = "/dev/";

/// Normalize a raw device path to its long form
///
/// Prepends [`DEVICE_PREFIX`] unless it is already present. Idempotent.
#[must_use]
pub fn normalize(raw: &str) -> String {
    if raw.starts_with(DEVICE_PREFIX) {
        raw.to_string()
    } else {
        format!("{DEVICE_PREFIX}{raw}")
    }
}

/// A device path, always stored in its `/dev/`-prefixed form
///
/// Equality, ordering and hashing are defined over the long form, so
/// `DeviceName::new("xvdb") == DeviceName::new("/dev/xvdb")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DeviceName(String);

impl DeviceName {
    /// Create a canonical device name from a raw path
    #[inline]
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    /// Name with the `/dev/` prefix
    #[inline]
    #[must_use]
    pub fn long_name(&self) -> &str {
        &self.0
    }

    /// Name without the `/dev/` prefix
    ///
    /// Empty when the long form is only the prefix.
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(DEVICE_PREFIX).unwrap_or(&self.0)
    }
}

impl Display for DeviceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for DeviceName {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for DeviceName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for DeviceName {
    fn from(raw: String) -> Self {
        if raw.starts_with(DEVICE_PREFIX) {
            Self(raw)
        } else {
            Self::new(raw)
        }
    }
}

impl From<DeviceName> for String {
    fn from(name: DeviceName) -> Self {
        name.0
    }
}
