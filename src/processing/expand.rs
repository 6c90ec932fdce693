//! Expand a single dotted key/value pair into a nested document.

use serde_json::{Map, Value};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DottedPath, NestedDocument};

/// Insert `value` at `path` inside `target`, creating intermediate objects where absent.
///
/// Existing intermediate objects are reused and extended, never replaced, so repeated calls
/// against one target accumulate. Returns the node at the leaf position.
///
/// Conflicts fail with [`IngestionError::StructureConflict`]:
///
/// - an intermediate segment already holds a leaf value
/// - the final segment already holds an object (nested paths would be lost)
///
/// Re-inserting over an existing leaf replaces it.
pub fn insert_nested_key<'a>(
    target: &'a mut NestedDocument,
    path: &DottedPath,
    value: Value,
) -> IngestionResult<&'a mut Value> {
    let segments = path.segments();
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| IngestionError::MalformedKey {
            key: path.to_string(),
            message: "path is empty".to_string(),
        })?;

    let mut node = target;
    for segment in parents {
        let child = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        node = match child {
            Value::Object(map) => map,
            _ => {
                return Err(IngestionError::StructureConflict {
                    path: path.to_string(),
                    segment: segment.clone(),
                    message: "already holds a leaf value".to_string(),
                });
            }
        };
    }

    if matches!(node.get(leaf.as_str()), Some(Value::Object(_))) {
        return Err(IngestionError::StructureConflict {
            path: path.to_string(),
            segment: leaf.clone(),
            message: "already holds nested fields".to_string(),
        });
    }

    node.insert(leaf.clone(), value);
    node.get_mut(leaf.as_str())
        .ok_or_else(|| IngestionError::StructureConflict {
            path: path.to_string(),
            segment: leaf.clone(),
            message: "was not stored".to_string(),
        })
}

/// Parse `key` as a dotted path and insert a string leaf.
pub fn insert_dotted<'a>(
    target: &'a mut NestedDocument,
    key: &str,
    value: &str,
) -> IngestionResult<&'a mut Value> {
    let path = DottedPath::parse(key)?;
    insert_nested_key(target, &path, Value::String(value.to_owned()))
}

/// Look up the value at a dotted path, if every segment resolves.
pub fn get_by_dot_path<'a>(root: &'a NestedDocument, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(crate::types::PATH_DELIMITER);
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}
