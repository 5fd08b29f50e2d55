//! SQLite-backed [`AttributeStore`].
//!
//! # Storage layout
//!
//! A single table `skill_attributes` is created (if it does not already
//! exist) with the following columns:
//!
//! | column      | type | description                              |
//! |-------------|------|------------------------------------------|
//! | object_key  | TEXT | user id the record belongs to (PK)       |
//! | attributes  | TEXT | JSON-encoded attribute record            |
//! | updated_at  | TEXT | RFC-3339 time of the last write (UTC)    |
//!
//! # Example
//!
//! ```rust
//! use mindclaw_store::{AttributeStore, SqliteAttributeStore};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = SqliteAttributeStore::open_in_memory().unwrap();
//! store.put("amzn1.ask.account.user", &json!({"robot": {"state": "open"}})).await.unwrap();
//!
//! let record = store.get("amzn1.ask.account.user").await.unwrap().unwrap();
//! assert_eq!(record["robot"]["state"], "open");
//! # });
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::{AttributeStore, StoreError};

/// Attribute store persisted to a local SQLite database.
///
/// Queries run on Tokio's blocking pool; the connection is serialised behind
/// a mutex.
#[derive(Clone)]
pub struct SqliteAttributeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAttributeStore {
    /// Open (or create) a persistent SQLite database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a temporary in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS skill_attributes (
                object_key TEXT NOT NULL PRIMARY KEY,
                attributes TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&guard)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl AttributeStore for SqliteAttributeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let key = key.to_string();
        let raw: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT attributes FROM skill_attributes WHERE object_key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        raw.map(|s| serde_json::from_str(&s).map_err(StoreError::from))
            .transpose()
    }

    async fn put(&self, key: &str, attributes: &Value) -> Result<(), StoreError> {
        let key = key.to_string();
        let body = serde_json::to_string(attributes)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO skill_attributes (object_key, attributes, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![key, body, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM skill_attributes WHERE object_key = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
    }
}
