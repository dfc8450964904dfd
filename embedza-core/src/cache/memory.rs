//! In-process cache.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;

use super::Cache;
use crate::error::StoreError;

/// In-memory cache shared across tasks.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, JsonValue>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
