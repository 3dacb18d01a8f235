//! String-keyed attribute storage for records and queries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AslError, Result};

/// Mapping from attribute key to text value.
///
/// Keys are unique: setting an existing key replaces its value in place.
/// Keys must be non-empty and neither keys nor values may contain NUL.
/// Iteration order is sorted by key and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap {
    entries: BTreeMap<String, String>,
}

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] if the key is empty or either
    /// side contains a NUL character.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        validate_key(&key)?;
        validate_text("value", &value)?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Inserts or overwrites `key` from raw bytes, which must be UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] for non-UTF-8 input or any
    /// condition rejected by [`set`](Self::set).
    pub fn set_utf8(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key = std::str::from_utf8(key)
            .map_err(|_| AslError::invalid_argument("expected text key, got bytes"))?;
        let value = std::str::from_utf8(value)
            .map_err(|_| AslError::invalid_argument("expected text value, got bytes"))?;
        self.set(key, value)
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::KeyNotFound`] if the key is not set.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AslError::KeyNotFound(key.to_string()))
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// Returns true if a value was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Returns true if `key` is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the set of keys currently present.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Returns an owned snapshot of all pairs.
    #[must_use]
    pub fn as_mapping(&self) -> BTreeMap<String, String> {
        self.entries.clone()
    }

    /// Iterates over key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no attributes are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets `key` only if it is not already present.
    pub(crate) fn set_default(&mut self, key: &str, value: impl FnOnce() -> String) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), value());
        }
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl TryFrom<BTreeMap<String, String>> for AttributeMap {
    type Error = AslError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self> {
        let mut map = Self::new();
        for (key, value) in entries {
            map.set(key, value)?;
        }
        Ok(map)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(AslError::invalid_argument("attribute key must not be empty"));
    }
    validate_text("key", key)
}

/// Rejects text that cannot cross the facility boundary.
pub(crate) fn validate_text(what: &str, text: &str) -> Result<()> {
    if text.contains('\0') {
        return Err(AslError::invalid_argument(format!(
            "{what} must not contain NUL characters"
        )));
    }
    Ok(())
}
