//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`IngestionPipeline::run`] (from [`pipeline`]) which:
//!
//! - opens the CSV source lazily via [`csv::open_csv_source`]
//! - nests, validates and persists each row into a [`crate::store::UserStore`]
//! - optionally reports row and run events to an [`IngestionObserver`]

pub mod csv;
pub mod observability;
pub mod pipeline;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
};
pub use pipeline::{prepare_user, IngestionPipeline, IngestionReport, PreparedRow, RowOutcome, SkipReason};
