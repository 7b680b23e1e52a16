//! SQLite-backed store.
//!
//! One `kv_entries` table holds every key. WAL journaling keeps concurrent
//! reads cheap while the sync engine writes, which matters on a device where
//! the UI reads drafts while a drain is running.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::config::AppConfig;

use super::{KeyValueStore, StorageError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Self::initialize(&pool).await?;
        info!(path = %path.display(), "opened survey store");
        Ok(Self { pool })
    }

    /// Opens the store at the platform data directory
    /// (`<data_dir>/fieldsurvey/survey.db`).
    pub async fn at_default_path() -> Result<Self, StorageError> {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("fieldsurvey");
        path.push("survey.db");
        Self::open(path).await
    }

    /// Opens the store at the configured path, falling back to the default
    /// location when none is set.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        match &config.database_path {
            Some(path) => Self::open(path).await,
            None => Self::at_default_path().await,
        }
    }

    /// An in-memory database for tests. Limited to a single connection so
    /// every query sees the same data.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::initialize(&pool).await?;
        Ok(Self { pool })
    }

    async fn initialize(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get("value"))
            .transpose()
            .map_err(Into::into)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT OR REPLACE INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // substr comparison instead of LIKE: draft keys contain `_`, which
        // LIKE would treat as a wildcard.
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE substr(key, 1, ?) = ? ORDER BY key")
            .bind(prefix.len() as i64)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.try_get("key"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(Into::into)
    }
}
