//! `mindclaw-store` – The Attribute Bucket
//!
//! Persistence collaborator for per-user skill attributes. Records are opaque
//! JSON objects addressed by an object key (the platform user id); the skill
//! decides what they mean.
//!
//! # Modules
//!
//! - [`memory`] – [`MemoryAttributeStore`][memory::MemoryAttributeStore]: a
//!   process-local map, used for tests and the `:memory:` bucket.
//! - [`sqlite`] – [`SqliteAttributeStore`][sqlite::SqliteAttributeStore]:
//!   a local SQLite file standing in for an object-store bucket.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryAttributeStore;
pub use sqlite::SqliteAttributeStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Bucket name that selects the in-memory store.
pub const MEMORY_BUCKET: &str = ":memory:";

/// Errors that can arise from attribute store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored attributes are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Attribute store lock poisoned")]
    Poisoned,
    #[error("Blocking store task failed: {0}")]
    Join(String),
}

/// Key-value access to per-user attribute records.
///
/// `get` reports a missing record as `Ok(None)`; absence is not an error.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Load the record stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `attributes` under `key`, replacing any previous record.
    async fn put(&self, key: &str, attributes: &Value) -> Result<(), StoreError>;

    /// Remove the record under `key`.  No-ops if it does not exist.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Open the store named by `bucket`.
///
/// [`MEMORY_BUCKET`] yields an empty [`MemoryAttributeStore`]; anything else
/// is treated as the path of a SQLite database file.
pub fn open_bucket(bucket: &str) -> Result<Arc<dyn AttributeStore>, StoreError> {
    if bucket == MEMORY_BUCKET {
        tracing::info!("using in-memory attribute store");
        return Ok(Arc::new(MemoryAttributeStore::new()));
    }
    tracing::info!(bucket, "opening SQLite attribute store");
    Ok(Arc::new(SqliteAttributeStore::open(bucket)?))
}
