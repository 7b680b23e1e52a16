//! Durable key-value storage.
//!
//! The whole offline state lives behind [`KeyValueStore`]: each draft under
//! its own key, the sync queue as one JSON array, and the reference-data
//! caches. Two implementations ship with the crate:
//!
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`SqliteStore`] for the device, a single `kv_entries` table in SQLite
//!
//! Values are opaque strings to this layer. The callers own the JSON inside.

pub mod keys;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async string key-value store with prefix listing.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every key starting with `prefix`, sorted ascending.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
