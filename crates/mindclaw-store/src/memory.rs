//! In-memory [`AttributeStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{AttributeStore, StoreError};

/// Process-local attribute store.  Contents vanish with the process.
#[derive(Default)]
pub struct MemoryAttributeStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }
}

#[async_trait]
impl AttributeStore for MemoryAttributeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, attributes: &Value) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(key.to_string(), attributes.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}
