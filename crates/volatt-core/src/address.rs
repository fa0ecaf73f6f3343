//! Terraform resource addresses
//!
//! Provides [`ResourceAddress`] for the `type.name[.index]` keys Terraform
//! uses for resources in a state module.

use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Parsed resource address
///
/// # Examples
/// - `aws_instance.web` → type `aws_instance`, name `web`, no index
/// - `aws_instance.web.3` → type `aws_instance`, name `web`, index `3`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    resource_type: String,
    name: String,
    index: Option<u32>,
}

impl ResourceAddress {
    /// Create an address from its parts
    #[inline]
    #[must_use]
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, index: Option<u32>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            index,
        }
    }

    /// Resource type, e.g. `aws_instance`
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Declared resource name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count index, if the resource was declared with `count`
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// `type.name`, dropping any index
    #[inline]
    #[must_use]
    pub fn without_index(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

impl Display for ResourceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(index) = self.index {
            write!(f, ".{index}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [resource_type, name] => Ok(Self::new(*resource_type, *name, None)),
            [resource_type, name, index] => {
                let index = index.parse::<u32>().map_err(|source| AddressError::InvalidIndex {
                    address: s.to_string(),
                    source,
                })?;
                Ok(Self::new(*resource_type, *name, Some(index)))
            }
            _ => Err(AddressError::WrongArity {
                address: s.to_string(),
                parts: parts.len(),
            }),
        }
    }
}

/// Errors from parsing a resource address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Not two or three dot-separated parts
    #[error("invalid resource name '{address}': expected 2 or 3 parts, got {parts}")]
    WrongArity { address: String, parts: usize },

    /// Third part is not a non-negative integer
    #[error("invalid resource name '{address}': {source}")]
    InvalidIndex {
        address: String,
        #[source]
        source: ParseIntError,
    },
}

impl AddressError {
    /// The address string that failed to parse
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::WrongArity { address, .. } | Self::InvalidIndex { address, .. } => address,
        }
    }
}
