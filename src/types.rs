//! Core data model types for ingestion.
//!
//! A source record arrives as a [`FlatRow`] of dotted-path keys. Nesting turns it into a
//! [`NestedDocument`], and a valid row is persisted as a [`UserRecord`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};

/// Segment delimiter for dotted paths.
pub const PATH_DELIMITER: char = '.';

/// Tree-shaped document: intermediate nodes are objects, leaves are strings.
pub type NestedDocument = serde_json::Map<String, serde_json::Value>;

/// One source record as key/value pairs, before nesting.
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow(BTreeMap<String, String>);

impl FlatRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a column value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a raw column value by its flat key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FlatRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = FlatRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl fmt::Display for FlatRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// A parsed dotted path such as `address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DottedPath {
    segments: Vec<String>,
}

impl DottedPath {
    /// Parse a dotted key. Every segment must be non-empty.
    pub fn parse(key: &str) -> IngestionResult<Self> {
        if key.is_empty() {
            return Err(IngestionError::MalformedKey {
                key: key.to_owned(),
                message: "path is empty".to_string(),
            });
        }

        let segments: Vec<String> = key.split(PATH_DELIMITER).map(str::to_owned).collect();
        if let Some(pos) = segments.iter().position(|s| s.is_empty()) {
            return Err(IngestionError::MalformedKey {
                key: key.to_owned(),
                message: format!("segment {} is empty", pos + 1),
            });
        }

        Ok(Self { segments })
    }

    /// Path segments in order, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final (leaf) segment.
    pub fn leaf(&self) -> &str {
        // parse() guarantees at least one segment.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut delimiter = [0u8; 4];
        f.write_str(&self.segments.join(PATH_DELIMITER.encode_utf8(&mut delimiter)))
    }
}

/// A validated row ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    /// First and last name concatenated with no separator.
    pub name: String,
    pub age: i64,
    pub address: Option<NestedDocument>,
    pub additional_info: NestedDocument,
}

/// A persisted user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store-generated identifier.
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub address: Option<NestedDocument>,
    pub additional_info: NestedDocument,
}

impl UserRecord {
    /// Attach a store-generated id to a new user.
    pub fn from_new(id: i64, user: NewUser) -> Self {
        Self {
            id,
            name: user.name,
            age: user.age,
            address: user.address,
            additional_info: user.additional_info,
        }
    }
}
