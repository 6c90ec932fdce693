//! `csv-user-import` streams a CSV file whose headers are dotted paths (`name.firstName`,
//! `address.city`, ...) into nested user documents, persists them through a
//! [`store::UserStore`], and reports the age distribution of everything stored.
//!
//! The primary entrypoint is [`ingestion::IngestionPipeline::run`]. Each row ends in exactly one
//! [`ingestion::RowOutcome`]: inserted, skipped by validation, or failed. A bad row never stops
//! the run; only a missing or unreadable source, or an unreachable store, does.
//!
//! ## Row rules
//!
//! - `name.firstName`, `name.lastName` and `age` are required; the stored name is first and last
//!   name concatenated with no separator, and `age` must be an integer
//! - `address.*` columns become the `address` document
//! - every other column is preserved, nested the same way, in `additional_info`
//!
//! ## Quick example: ingest into memory
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use csv_user_import::ingestion::IngestionPipeline;
//! use csv_user_import::processing::{AgeDistribution, StatisticsAggregator};
//! use csv_user_import::store::MemoryUserStore;
//! use csv_user_import::types::FlatRow;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), csv_user_import::IngestionError> {
//! let store = Arc::new(MemoryUserStore::new());
//! let pipeline = IngestionPipeline::new(store.clone());
//!
//! let row: FlatRow = [("name.firstName", "Ann"), ("name.lastName", "Lee"), ("age", "25")]
//!     .into_iter()
//!     .collect();
//! let report = pipeline.run_rows(vec![Ok(row)]).await?;
//! assert_eq!(report.stats.inserted, 1);
//! assert_eq!(store.records()[0].name, "AnnLee");
//!
//! let dist = StatisticsAggregator::new(store).compute().await?;
//! assert!(matches!(dist, AgeDistribution::Buckets { total: 1, .. }));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: CSV row source, the pipeline, and observers
//! - [`processing`]: dotted-path nesting, extras isolation, age statistics
//! - [`store`]: persistence seam with SQLite and in-memory implementations
//! - [`server`]: axum HTTP surface, configuration and logging setup
//! - [`types`]: row, path, document and record types
//! - [`error`]: error types used across ingestion

pub mod error;
pub mod ingestion;
pub mod processing;
pub mod server;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
