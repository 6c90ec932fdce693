//! Persistence of user records.
//!
//! The pipeline and the aggregator only see [`UserStore`]. Two implementations ship:
//!
//! - [`SqliteUserStore`]: the relational store used by the server
//! - [`MemoryUserStore`]: an in-process store for tests and dry runs

mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{NewUser, UserRecord};

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

/// Errors raised by a [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached at all (closed, unopenable, poisoned).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a single write.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("json column error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error affects the connection rather than one row.
    pub fn is_connection_level(&self) -> bool {
        use rusqlite::ErrorCode;

        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Rejected(_) | StoreError::Json(_) => false,
            StoreError::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::DatabaseCorrupt
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::PermissionDenied
                        | ErrorCode::DiskFull
                )
            ),
        }
    }
}

/// Append-only store of users plus the age read-back used for statistics.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert one user and return it with its generated id.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Every stored age, in insertion order. `None` marks an absent or non-integer value.
    async fn fetch_ages(&self) -> Result<Vec<Option<i64>>, StoreError>;
}
