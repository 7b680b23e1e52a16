//! # Reference Data Cache
//!
//! Cadastral lookup lists the capture forms need while offline: object
//! types, administrative units, and land-use types. Each list is cached as a
//! JSON blob in the key-value store, alongside a dataset version tag and the
//! timestamp of the last freshness check.
//!
//! Fetching the lists from the backend is deployment-specific and happens
//! outside this crate; the cache only answers "what do we have" and "is it
//! stale yet".

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::storage::{keys, KeyValueStore, StorageError};

#[derive(Debug, Error)]
pub enum RefDataError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("reference data serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The cached reference lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    ObjectTypes,
    AdminUnits,
    LandUseTypes,
}

impl RefKind {
    fn storage_key(self) -> &'static str {
        match self {
            Self::ObjectTypes => keys::REF_OBJECT_TYPES,
            Self::AdminUnits => keys::REF_ADMIN_UNITS,
            Self::LandUseTypes => keys::REF_LAND_USE_TYPES,
        }
    }
}

/// One entry of a reference list: a stable code and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefItem {
    pub code: String,
    pub label: String,
}

impl RefItem {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

pub struct RefDataCache {
    store: Arc<dyn KeyValueStore>,
}

impl RefDataCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cached list of the given kind, or `None` when never populated.
    pub async fn get(&self, kind: RefKind) -> Result<Option<Vec<RefItem>>, RefDataError> {
        match self.store.get(kind.storage_key()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replaces the cached list of the given kind.
    pub async fn put(&self, kind: RefKind, items: &[RefItem]) -> Result<(), RefDataError> {
        let raw = serde_json::to_string(items)?;
        self.store.set(kind.storage_key(), &raw).await?;
        Ok(())
    }

    /// Version tag of the dataset the caches were built from.
    pub async fn data_version(&self) -> Result<Option<String>, RefDataError> {
        Ok(self.store.get(keys::CADASTRAL_DATA_VERSION).await?)
    }

    pub async fn set_data_version(&self, version: &str) -> Result<(), RefDataError> {
        self.store.set(keys::CADASTRAL_DATA_VERSION, version).await?;
        Ok(())
    }

    /// When the app last checked upstream for fresher reference data. An
    /// unparseable stored timestamp counts as never checked.
    pub async fn last_update_check(&self) -> Result<Option<DateTime<Utc>>, RefDataError> {
        let Some(raw) = self.store.get(keys::CADASTRAL_LAST_UPDATE_CHECK).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Ok(Some(parsed.with_timezone(&Utc))),
            Err(error) => {
                warn!(raw = %raw, error = %error, "discarding unreadable update-check timestamp");
                Ok(None)
            }
        }
    }

    /// Records that a freshness check ran just now.
    pub async fn mark_update_check(&self) -> Result<(), RefDataError> {
        self.store
            .set(keys::CADASTRAL_LAST_UPDATE_CHECK, &Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    /// True when the last freshness check is older than `max_age` or never
    /// happened.
    pub async fn needs_refresh(&self, max_age: Duration) -> Result<bool, RefDataError> {
        match self.last_update_check().await? {
            Some(checked_at) => Ok(Utc::now() - checked_at >= max_age),
            None => Ok(true),
        }
    }
}
