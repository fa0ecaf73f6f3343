//! `Name` tag filtering

use regex::Regex;

use crate::InventoryError;

/// Matches instance names against a pattern where `*` is a wildcard
///
/// Everything other than `*` matches literally, and the whole name must
/// match.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: String,
    regex: Regex,
}

impl NameFilter {
    /// Compile a name pattern
    ///
    /// # Errors
    /// Returns [`InventoryError::InvalidPattern`] if the pattern cannot be compiled
    pub fn new(pattern: &str) -> Result<Self, InventoryError> {
        let body = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        let regex = Regex::new(&format!("^{body}$")).map_err(|source| InventoryError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as given
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `name` matches
    #[inline]
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
