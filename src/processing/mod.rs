//! Row reshaping and aggregation.
//!
//! Currently implemented:
//!
//! - [`expand`]: insert one dotted key into a nested document
//! - [`nest`]: nest an entire [`crate::types::FlatRow`]
//! - [`extras`]: known-schema detection and isolation of extra columns
//! - [`stats`]: age-distribution aggregation over stored users
//!
//! ## Example: nest a row and split off its extras
//!
//! ```rust
//! use csv_user_import::processing::{build_nested_object, isolate_extras, SchemaKeySet};
//! use csv_user_import::types::FlatRow;
//! use serde_json::json;
//!
//! let row: FlatRow = [
//!     ("name.firstName", "Cy"),
//!     ("name.lastName", "Ng"),
//!     ("age", "45"),
//!     ("address.city", "Lund"),
//!     ("hobby", "chess"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let doc = build_nested_object(&row).unwrap();
//! assert_eq!(doc["address"], json!({"city": "Lund"}));
//!
//! let schema = SchemaKeySet::for_document(&doc);
//! let extras = isolate_extras(&row, &schema).unwrap();
//! assert_eq!(serde_json::Value::Object(extras), json!({"hobby": "chess"}));
//! ```

pub mod expand;
pub mod extras;
pub mod nest;
pub mod stats;

pub use expand::{get_by_dot_path, insert_dotted, insert_nested_key};
pub use extras::{flatten_keys, isolate_extras, SchemaKeySet};
pub use nest::build_nested_object;
pub use stats::{AgeBucket, AgeDistribution, AgeHistogram, StatisticsAggregator};
