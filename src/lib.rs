//! FieldSurvey - Main Library
//!
//! FieldSurvey is the offline-first core of a mobile land-parcel survey
//! app. Officers capture geolocated surveys in the field, usually without
//! coverage; this crate keeps every draft and submission durable on the
//! device and replays pending work when connectivity returns.
//!
//! # Overview
//!
//! This library provides:
//! - A draft lifecycle for the survey being captured: create, edit, attach
//!   photos, walk a rough boundary, save, resume, submit
//! - A persistent sync queue that drains oldest-first once online, with a
//!   per-item retry budget and network-aware aborts
//! - A REST backend adapter for the survey service (row inserts, photo blob
//!   upload, boundary vertices)
//! - Offline caches for the cadastral reference lists the capture forms use
//!
//! # Module Structure
//!
//! - **`model`** - Survey, photo, vertex and GeoJSON types; the persisted
//!   camelCase wire format
//! - **`storage`** - The key-value store trait plus SQLite and in-memory
//!   implementations
//! - **`draft`** - The [`draft::DraftSession`] capture workflow
//! - **`sync`** - The [`sync::SyncQueue`] engine and the job uploader
//! - **`backend`** - The [`backend::RemoteBackend`] trait and its HTTP
//!   implementation
//! - **`network`** - Connectivity signal feeding the queue
//! - **`refdata`** - Cached cadastral reference lists
//! - **`validation`** - Pluggable submission rules
//! - **`config`** - Builder, TOML and environment configuration
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fieldsurvey::backend::HttpBackend;
//! use fieldsurvey::config::AppConfig;
//! use fieldsurvey::draft::DraftSession;
//! use fieldsurvey::model::{GeoPoint, Photo, SurveyPatch};
//! use fieldsurvey::network::ManualReachability;
//! use fieldsurvey::storage::{KeyValueStore, SqliteStore};
//! use fieldsurvey::sync::{SyncQueue, Uploader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::builder()
//!     .backend_url("https://survey.example.org")
//!     .api_key("anon-key")
//!     .build()?;
//!
//! let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::from_config(&config).await?);
//! let uploader = Uploader::new(Arc::new(HttpBackend::from_config(&config)));
//! let monitor = Arc::new(ManualReachability::new(true));
//! let queue = SyncQueue::start(store.clone(), uploader.clone(), (&config).into(), monitor).await?;
//!
//! let mut session = DraftSession::new(store, uploader, queue.clone());
//! session.start_new_survey("officer-17");
//! session
//!     .update_survey(SurveyPatch {
//!         location_name: Some("Parcel 7, District 1".into()),
//!         gps_point: Some(GeoPoint::new(106.7009, 10.7769)),
//!         ..Default::default()
//!     })
//!     .await?;
//! session.add_photo(Photo::new("file:///data/photos/p1.jpg")).await?;
//!
//! let outcome = session.submit_survey(queue.is_online()).await?;
//! println!("submitted: {outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! # Persistence Format
//!
//! Everything durable lives in the key-value store as JSON with camelCase
//! keys: one entry per draft (`@survey_draft_<id>`), the whole sync queue
//! as a single array (`@sync_queue`), and the reference-data caches under
//! their `@ref_*` keys. These keys and shapes are a wire format shared with
//! existing installs; see `storage::keys`.
//!
//! # Thread Safety
//!
//! [`sync::SyncQueue`] is a cheap-to-clone handle over shared state and is
//! safe to use from any task. Drains are single-flight: concurrent calls
//! collapse into one pass. [`draft::DraftSession`] is deliberately not
//! shared; it models the one capture screen the user is looking at.

/// Survey data model and persisted wire format
pub mod model;

/// Durable key-value storage (SQLite and in-memory)
pub mod storage;

/// Remote backend trait and REST implementation
pub mod backend;

/// Connectivity monitoring
pub mod network;

/// Configuration loading and validation
pub mod config;

/// Pluggable submission validation
pub mod validation;

/// Offline sync queue and job uploader
pub mod sync;

/// Active draft lifecycle
pub mod draft;

/// Cadastral reference data caches
pub mod refdata;
