//! Application configuration module
//!
//! Connection settings for the survey backend plus local tuning knobs.
//! Values come from an embedding app via the builder, from a TOML file, or
//! from `SURVEY_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Retry budget a queue item gets before it is parked.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

const DEFAULT_STORAGE_BUCKET: &str = "survey-media";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the survey backend.
    pub backend_url: String,
    /// Static API key sent with every request.
    pub api_key: String,
    /// Blob storage bucket holding survey photos.
    pub storage_bucket: String,
    /// Local database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Per-item retry budget for the sync queue.
    pub max_retries: u32,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Reads `SURVEY_BACKEND_URL`, `SURVEY_API_KEY` and the optional
    /// `SURVEY_STORAGE_BUCKET`, `SURVEY_DB_PATH` and `SURVEY_MAX_RETRIES`
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("SURVEY_BACKEND_URL") {
            builder = builder.backend_url(url);
        }
        if let Ok(key) = std::env::var("SURVEY_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Ok(bucket) = std::env::var("SURVEY_STORAGE_BUCKET") {
            builder = builder.storage_bucket(bucket);
        }
        if let Ok(path) = std::env::var("SURVEY_DB_PATH") {
            builder = builder.database_path(path);
        }
        if let Ok(raw) = std::env::var("SURVEY_MAX_RETRIES") {
            let parsed = raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "SURVEY_MAX_RETRIES",
                message: format!("not a number: {raw}"),
            })?;
            builder = builder.max_retries(parsed);
        }
        builder.build()
    }

    /// Parses the TOML configuration format.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut builder = Self::builder();
        if let Some(url) = file.backend_url {
            builder = builder.backend_url(url);
        }
        if let Some(key) = file.api_key {
            builder = builder.api_key(key);
        }
        if let Some(bucket) = file.storage_bucket {
            builder = builder.storage_bucket(bucket);
        }
        if let Some(path) = file.database_path {
            builder = builder.database_path(path);
        }
        if let Some(retries) = file.max_retries {
            builder = builder.max_retries(retries);
        }
        builder.build()
    }

    /// Loads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    backend_url: Option<String>,
    api_key: Option<String>,
    storage_bucket: Option<String>,
    database_path: Option<PathBuf>,
    max_retries: Option<u32>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    backend_url: Option<String>,
    api_key: Option<String>,
    storage_bucket: Option<String>,
    database_path: Option<PathBuf>,
    max_retries: Option<u32>,
}

impl AppConfigBuilder {
    /// Set the backend base URL
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the blob storage bucket
    pub fn storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    /// Set the local database file path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the per-item retry budget
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let backend_url = self
            .backend_url
            .ok_or(ConfigError::MissingValue("backend_url"))?;
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(backend_url));
        }

        let api_key = self.api_key.ok_or(ConfigError::MissingValue("api_key"))?;

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(AppConfig {
            backend_url,
            api_key,
            storage_bucket: self
                .storage_bucket
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
            database_path: self.database_path,
            max_retries,
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
