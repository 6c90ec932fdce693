//! SQLite-backed user store.
//!
//! One connection is opened at startup and shared behind a mutex. Every call runs on the
//! blocking pool so the async caller suspends until the statement completes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use tracing::info;

use crate::types::{NestedDocument, NewUser, UserRecord};

use super::{StoreError, UserStore};

const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        name            TEXT    NOT NULL,
        age             INTEGER NOT NULL,
        address         TEXT,
        additional_info TEXT    NOT NULL DEFAULT '{}'
    )";

/// Where a database URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Memory,
    File(PathBuf),
}

/// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare path.
fn parse_database_url(url: &str) -> Result<Location, StoreError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StoreError::Unavailable("database url is empty".to_string()));
    }
    if matches!(url, "sqlite::memory:" | ":memory:" | "sqlite://:memory:") {
        return Ok(Location::Memory);
    }
    if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        return Ok(Location::File(PathBuf::from(path)));
    }
    if url.contains("://") {
        return Err(StoreError::Unavailable(format!(
            "unsupported database url scheme: {url}"
        )));
    }
    Ok(Location::File(PathBuf::from(url)))
}

/// User store over a single shared SQLite connection.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    /// Open the database named by `url` and create the `users` table if missing.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let conn = match parse_database_url(url)? {
            Location::Memory => Connection::open_in_memory()?,
            Location::File(path) => Connection::open(&path)?,
        };
        let store = Self::from_connection(conn)?;
        info!(url, "connected to user store");
        Ok(store)
    }

    /// Wrap an already-open connection, creating the schema if needed.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_USERS_TABLE)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Every stored user, ordered by id.
    pub async fn fetch_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, age, address, additional_info FROM users ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, name, age, address, extras)| -> Result<UserRecord, StoreError> {
                    Ok(UserRecord {
                        id,
                        name,
                        age,
                        address: address
                            .map(|text| serde_json::from_str::<NestedDocument>(&text))
                            .transpose()?,
                        additional_info: serde_json::from_str(&extras)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let address = user.address.as_ref().map(serde_json::to_string).transpose()?;
        let extras = serde_json::to_string(&user.additional_info)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (name, age, address, additional_info) VALUES (?1, ?2, ?3, ?4)",
                params![user.name, user.age, address, extras],
            )?;
            Ok(UserRecord::from_new(conn.last_insert_rowid(), user))
        })
        .await
    }

    async fn fetch_ages(&self) -> Result<Vec<Option<i64>>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT age FROM users ORDER BY id")?;
            let ages = stmt
                .query_map([], |row| row.get::<_, SqlValue>(0))?
                .map(|value| {
                    value.map(|v| match v {
                        SqlValue::Integer(age) => Some(age),
                        _ => None,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ages)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde_json::json;

    use super::{parse_database_url, Location, SqliteUserStore};
    use crate::store::{StoreError, UserStore};
    use crate::types::{NestedDocument, NewUser};

    fn doc(v: serde_json::Value) -> NestedDocument {
        match v {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn parses_database_urls() {
        assert_eq!(parse_database_url("sqlite::memory:").unwrap(), Location::Memory);
        assert_eq!(
            parse_database_url("sqlite://data/users.db").unwrap(),
            Location::File("data/users.db".into())
        );
        assert_eq!(
            parse_database_url("users.db").unwrap(),
            Location::File("users.db".into())
        );
        assert!(matches!(
            parse_database_url("postgres://localhost/db"),
            Err(StoreError::Unavailable(_))
        ));
        assert!(parse_database_url("  ").is_err());
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = SqliteUserStore::connect("sqlite::memory:").unwrap();
        let inserted = store
            .insert_user(NewUser {
                name: "CyNg".to_string(),
                age: 45,
                address: Some(doc(json!({"city": "Lund"}))),
                additional_info: doc(json!({"hobby": "chess"})),
            })
            .await
            .unwrap();
        assert_eq!(inserted.id, 1);

        let users = store.fetch_users().await.unwrap();
        assert_eq!(users, vec![inserted]);
        assert_eq!(store.fetch_ages().await.unwrap(), vec![Some(45)]);
    }

    #[tokio::test]
    async fn null_address_round_trips_as_none() {
        let store = SqliteUserStore::connect(":memory:").unwrap();
        store
            .insert_user(NewUser {
                name: "AnnLee".to_string(),
                age: 25,
                address: None,
                additional_info: NestedDocument::new(),
            })
            .await
            .unwrap();
        let users = store.fetch_users().await.unwrap();
        assert_eq!(users[0].address, None);
        assert!(users[0].additional_info.is_empty());
    }

    #[tokio::test]
    async fn non_integer_ages_read_back_as_none() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteUserStore::from_connection(conn).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO users (name, age) VALUES ('X', 'not a number'), ('Y', 33)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(store.fetch_ages().await.unwrap(), vec![None, Some(33)]);
    }

    #[test]
    fn constraint_violations_are_row_level() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(super::CREATE_USERS_TABLE).unwrap();
        let err = conn
            .execute("INSERT INTO users (name, age) VALUES (NULL, 1)", [])
            .unwrap_err();
        assert!(!StoreError::from(err).is_connection_level());
        assert!(StoreError::Unavailable("gone".to_string()).is_connection_level());
    }
}
