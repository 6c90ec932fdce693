//! Known-schema detection and isolation of extra columns.
//!
//! Isolation is two-pass: the row is nested first so the address sub-keys actually present can
//! be added to the [`SchemaKeySet`], and only then are the remaining flat keys nested into the
//! extras document.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::IngestionResult;
use crate::types::{FlatRow, NestedDocument, PATH_DELIMITER};

use super::expand::insert_dotted;

/// Flat key of the first name column.
pub const FIRST_NAME_KEY: &str = "name.firstName";
/// Flat key of the last name column.
pub const LAST_NAME_KEY: &str = "name.lastName";
/// Flat key of the age column.
pub const AGE_KEY: &str = "age";
/// Top-level key whose sub-keys are part of the known schema.
pub const ADDRESS_KEY: &str = "address";

/// Required fields, always part of the known schema.
pub const BASE_KEYS: [&str; 3] = [FIRST_NAME_KEY, LAST_NAME_KEY, AGE_KEY];

/// The dotted paths considered "known" for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaKeySet {
    keys: BTreeSet<String>,
}

impl SchemaKeySet {
    /// Only the base fields (`name.firstName`, `name.lastName`, `age`).
    pub fn base() -> Self {
        Self {
            keys: BASE_KEYS.iter().map(|k| (*k).to_owned()).collect(),
        }
    }

    /// Base fields plus `address.<k>` for every node under the document's `address` object.
    ///
    /// Deeper address paths are included at every level, so `address.geo.lat` yields both
    /// `address.geo` and `address.geo.lat`. A scalar `address` contributes nothing.
    pub fn for_document(doc: &NestedDocument) -> Self {
        let mut set = Self::base();
        if let Some(Value::Object(address)) = doc.get(ADDRESS_KEY) {
            collect_paths(ADDRESS_KEY, address, &mut set.keys);
        }
        set
    }

    /// Whether `key` is part of the known schema.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Iterate the known keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

fn collect_paths(prefix: &str, node: &NestedDocument, out: &mut BTreeSet<String>) {
    for (key, value) in node {
        let path = format!("{prefix}{PATH_DELIMITER}{key}");
        if let Value::Object(child) = value {
            collect_paths(&path, child, out);
        }
        out.insert(path);
    }
}

/// Nest every column of `row` whose key is absent from `schema`.
///
/// Returns an empty document when every column is known.
pub fn isolate_extras(row: &FlatRow, schema: &SchemaKeySet) -> IngestionResult<NestedDocument> {
    let mut extras = NestedDocument::new();
    for (key, value) in row.iter().filter(|(key, _)| !schema.contains(key)) {
        insert_dotted(&mut extras, key, value)?;
    }
    Ok(extras)
}

/// Flatten a nested document back into dotted leaf keys.
pub fn flatten_keys(doc: &NestedDocument) -> Vec<String> {
    fn walk(prefix: Option<&str>, node: &NestedDocument, out: &mut Vec<String>) {
        for (key, value) in node {
            let path = match prefix {
                Some(p) => format!("{p}{PATH_DELIMITER}{key}"),
                None => key.clone(),
            };
            match value {
                Value::Object(child) => walk(Some(&path), child, out),
                _ => out.push(path),
            }
        }
    }

    let mut out = Vec::new();
    walk(None, doc, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{flatten_keys, isolate_extras, SchemaKeySet};
    use crate::processing::nest::build_nested_object;
    use crate::types::FlatRow;

    fn row(pairs: &[(&str, &str)]) -> FlatRow {
        pairs.iter().copied().collect()
    }

    #[test]
    fn base_row_has_no_extras() {
        let r = row(&[("name.firstName", "Ann"), ("name.lastName", "Lee"), ("age", "25")]);
        let doc = build_nested_object(&r).unwrap();
        let extras = isolate_extras(&r, &SchemaKeySet::for_document(&doc)).unwrap();
        assert!(extras.is_empty());
    }

    #[test]
    fn address_subkeys_are_known_and_others_are_extras() {
        let r = row(&[
            ("name.firstName", "Cy"),
            ("name.lastName", "Ng"),
            ("age", "45"),
            ("address.city", "Lund"),
            ("hobby", "chess"),
            ("name.middleName", "Q"),
        ]);
        let doc = build_nested_object(&r).unwrap();
        let schema = SchemaKeySet::for_document(&doc);
        assert!(schema.contains("address.city"));
        assert!(!schema.contains("hobby"));

        let extras = isolate_extras(&r, &schema).unwrap();
        assert_eq!(
            Value::Object(extras),
            json!({"hobby": "chess", "name": {"middleName": "Q"}})
        );
    }

    #[test]
    fn deep_address_paths_are_known() {
        let r = row(&[("address.geo.lat", "1"), ("address.geo.lng", "2"), ("address.zip", "3")]);
        let schema = SchemaKeySet::for_document(&build_nested_object(&r).unwrap());
        let keys: Vec<&str> = schema.iter().collect();
        assert!(keys.contains(&"address.geo"));
        assert!(keys.contains(&"address.geo.lat"));
        assert!(keys.contains(&"address.zip"));
        assert!(isolate_extras(&r, &schema).unwrap().is_empty());
    }

    #[test]
    fn address_columns_are_extras_without_an_address_node() {
        let schema = SchemaKeySet::base();
        let r = row(&[("address.city", "Lund")]);
        let extras = isolate_extras(&r, &schema).unwrap();
        assert_eq!(Value::Object(extras), json!({"address": {"city": "Lund"}}));
    }

    #[test]
    fn scalar_address_column_is_an_extra() {
        let r = row(&[("name.firstName", "A"), ("address", "Main St 1")]);
        let doc = build_nested_object(&r).unwrap();
        let schema = SchemaKeySet::for_document(&doc);
        assert_eq!(schema, SchemaKeySet::base());
        let extras = isolate_extras(&r, &schema).unwrap();
        assert_eq!(Value::Object(extras), json!({"address": "Main St 1"}));
    }

    #[test]
    fn flattened_extras_never_intersect_the_schema() {
        let rows = [
            row(&[("name.firstName", "a"), ("age", "1"), ("x.y", "2"), ("address.c", "3")]),
            row(&[("name.lastName", "b"), ("misc", "4"), ("address.geo.lat", "5")]),
            row(&[("z", "6"), ("name.nick", "7"), ("age2", "8")]),
        ];
        for r in &rows {
            let schema = SchemaKeySet::for_document(&build_nested_object(r).unwrap());
            let extras = isolate_extras(r, &schema).unwrap();
            for key in flatten_keys(&extras) {
                assert!(!schema.contains(&key), "extra key {key} is part of the schema");
            }
        }
    }
}
