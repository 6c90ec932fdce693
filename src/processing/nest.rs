//! Build a nested document from a whole flat row.

use crate::error::IngestionResult;
use crate::types::{FlatRow, NestedDocument};

use super::expand::insert_dotted;

/// Nest every `(key, value)` pair of `row` into a fresh document.
///
/// The result does not depend on column order. Fails with `MalformedKey` for a bad key and
/// `StructureConflict` when a column is both a leaf and a parent (e.g. `address` next to
/// `address.city`).
pub fn build_nested_object(row: &FlatRow) -> IngestionResult<NestedDocument> {
    let mut doc = NestedDocument::new();
    for (key, value) in row.iter() {
        insert_dotted(&mut doc, key, value)?;
    }
    Ok(doc)
}
