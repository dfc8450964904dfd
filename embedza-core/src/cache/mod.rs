//! Key/value cache used by network-bound stages.
//!
//! Stages only rely on `get`/`set` over JSON values. Expiry is the caller's
//! business: entries carry their own timestamps.

mod disk;
mod memory;

pub use disk::{CacheStats, DiskCache};
pub use memory::MemoryCache;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::StoreError;

/// Trait for cache backends, enabling mockability in tests.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError>;
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<JsonValue>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: JsonValue) -> Result<(), StoreError> {
        Ok(())
    }
}
