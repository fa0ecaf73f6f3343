//! Flattened attribute expansion
//!
//! Terraform v3 state stores nested values as flat string maps:
//!
//! ```text
//! ebs_block_device.#                       = "1"
//! ebs_block_device.2576023345.device_name  = "/dev/xvdb"
//! ebs_block_device.2576023345.volume_size  = "10"
//! tags.%                                   = "1"
//! tags.Name                                = "web"
//! ```
//!
//! Lists carry a `.#` count, maps an optional `.%` count. Set elements are
//! keyed by their hash instead of a position; either way elements are
//! returned in ascending numeric key order. The `#` count is only treated as
//! a hint that the key is a list, since hand-edited state can get it wrong.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Value Terraform writes for a list whose length is not known yet
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Expand `key` out of a flattened attribute map
///
/// Scalars `"true"`/`"false"` become booleans, other scalars strings.
/// Returns `Ok(None)` if nothing is stored under `key`.
///
/// # Errors
/// Returns error if a list count or list element key is not an integer
pub fn expand(attrs: &BTreeMap<String, String>, key: &str) -> Result<Option<Value>, FlatmapError> {
    if let Some(v) = attrs.get(key) {
        return Ok(Some(scalar(v)));
    }

    if let Some(count) = attrs.get(&format!("{key}.#")) {
        if count == UNKNOWN_VALUE {
            return Ok(Some(Value::String(count.clone())));
        }
        return expand_array(attrs, key, count).map(|list| Some(Value::Array(list)));
    }

    let prefix = format!("{key}.");
    if with_prefix(attrs, &prefix).next().is_some() {
        return expand_map(attrs, &prefix).map(|map| Some(Value::Object(map)));
    }

    Ok(None)
}

/// Expand a list of maps and stringify every element value
///
/// # Errors
/// Returns error if `key` is absent, not a list, or has a non-map element
pub fn expand_list_of_maps(
    attrs: &BTreeMap<String, String>,
    key: &str,
) -> Result<Vec<BTreeMap<String, String>>, FlatmapError> {
    let Some(value) = expand(attrs, key)? else {
        return Err(FlatmapError::Missing(key.to_string()));
    };
    let Value::Array(items) = value else {
        return Err(FlatmapError::NotAList(key.to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, stringify(&v))).collect()),
            _ => Err(FlatmapError::ElementNotAMap {
                key: key.to_string(),
                position,
            }),
        })
        .collect()
}

/// Remove `key` and everything nested under it
pub fn delete(attrs: &mut BTreeMap<String, String>, key: &str) {
    let prefix = format!("{key}.");
    attrs.retain(|k, _| k != key && !k.starts_with(&prefix));
}

fn with_prefix<'a>(
    attrs: &'a BTreeMap<String, String>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
    attrs
        .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}

fn scalar(v: &str) -> Value {
    match v {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(v.to_string()),
    }
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First path segment after `prefix`
fn segment<'a>(key: &'a str, prefix: &str) -> &'a str {
    let rest = &key[prefix.len()..];
    rest.split_once('.').map_or(rest, |(head, _)| head)
}

fn expand_array(attrs: &BTreeMap<String, String>, key: &str, count: &str) -> Result<Vec<Value>, FlatmapError> {
    let num: u64 = count.parse().map_err(|_| FlatmapError::InvalidCount {
        key: key.to_string(),
        value: count.to_string(),
    })?;
    if num == 0 {
        return Ok(Vec::new());
    }

    let prefix = format!("{key}.");
    // numeric key -> whether it was marked computed with `~`
    let mut indices: BTreeMap<u64, bool> = BTreeMap::new();
    for (k, _) in with_prefix(attrs, &prefix) {
        let seg = segment(k, &prefix);
        if seg == "#" {
            continue;
        }
        let (computed, digits) = match seg.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, seg),
        };
        let index: u64 = digits.parse().map_err(|_| FlatmapError::InvalidIndex {
            key: key.to_string(),
            segment: seg.to_string(),
        })?;
        *indices.entry(index).or_default() |= computed;
    }

    indices
        .into_iter()
        .map(|(index, computed)| {
            let child = if computed {
                format!("{key}.~{index}")
            } else {
                format!("{key}.{index}")
            };
            expand(attrs, &child).map(Option::unwrap_or_default)
        })
        .collect()
}

fn expand_map(attrs: &BTreeMap<String, String>, prefix: &str) -> Result<Map<String, Value>, FlatmapError> {
    if attrs.get(&format!("{prefix}%")).map(String::as_str) == Some("0") {
        return Ok(Map::new());
    }

    let mut result = Map::new();
    for (k, _) in with_prefix(attrs, prefix) {
        let seg = segment(k, prefix);
        if seg == "%" || result.contains_key(seg) {
            continue;
        }
        let value = expand(attrs, &format!("{prefix}{seg}"))?.unwrap_or_default();
        result.insert(seg.to_string(), value);
    }
    Ok(result)
}

/// Errors expanding flattened attributes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlatmapError {
    /// Nothing stored under the key
    #[error("attribute '{0}' is not present")]
    Missing(String),

    /// Key expands to something other than a list
    #[error("attribute '{0}' is not a list")]
    NotAList(String),

    /// List element is not a map
    #[error("element {position} of '{key}' is not a map")]
    ElementNotAMap { key: String, position: usize },

    /// `.#` count is not an integer
    #[error("invalid count '{value}' for '{key}'")]
    InvalidCount { key: String, value: String },

    /// List element key is not an integer
    #[error("invalid element key '{segment}' in '{key}'")]
    InvalidIndex { key: String, segment: String },
}
