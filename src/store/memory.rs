use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{NewUser, UserRecord};

use super::{StoreError, UserStore};

/// Keeps users in a `Vec`; ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: Mutex<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored users in insertion order.
    pub fn records(&self) -> Vec<UserRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        let record = UserRecord::from_new(records.len() as i64 + 1, user);
        records.push(record.clone());
        Ok(record)
    }

    async fn fetch_ages(&self) -> Result<Vec<Option<i64>>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(records.iter().map(|r| Some(r.age)).collect())
    }
}
