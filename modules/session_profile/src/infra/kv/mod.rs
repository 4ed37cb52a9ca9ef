//! String-keyed JSON store with prefix scans.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("kv backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("kv value under '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("kv value could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Last-write-wins per key; no cross-key transactions, no TTL.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value under `key`; a missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), KvError>;

    /// Remove `key`; returns whether a value existed.
    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Every value whose key starts with `prefix`, in backend order.
    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<serde_json::Value>, KvError>;
}
