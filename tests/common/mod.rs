//! Common test utilities and helpers
//!
//! Shared fixtures for the integration suites: a scriptable in-process
//! backend, a fully wired session/queue harness over an in-memory store,
//! and sample survey data.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use fieldsurvey::backend::{
    BackendError, LocationRecord, LocationUpdate, MediaRecord, NewLocationRecord, NewMediaRecord,
    RemoteBackend, VertexRow,
};
use fieldsurvey::draft::DraftSession;
use fieldsurvey::model::{GeoPoint, Photo, SurveyBundle, SurveyDraft, Vertex};
use fieldsurvey::storage::{KeyValueStore, MemoryStore};
use fieldsurvey::sync::{MediaJob, QueueConfig, SyncJob, SyncQueue, Uploader, VerticesJob};

/// Backend operations that can be scripted individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    InsertLocation,
    UpdateLocation,
    UploadBlob,
    InsertMedia,
    BulkInsertVertices,
    QueryLocations,
}

/// How a scripted operation should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail like the network dropped.
    Transient,
    /// Fail like the backend refused the payload.
    Rejected,
    /// Refuse exactly one call, then behave again.
    RejectOnce,
    /// Park the call until [`MockBackend::release_held`], then succeed.
    Hold,
}

#[derive(Default)]
struct MockState {
    calls: Vec<BackendOp>,
    modes: HashMap<BackendOp, FailureMode>,
    locations: Vec<NewLocationRecord>,
    updates: Vec<(String, String)>,
    media_rows: Vec<NewMediaRecord>,
    vertex_rows: Vec<VertexRow>,
    blob_paths: Vec<String>,
}

/// Scriptable [`RemoteBackend`] that records everything it is asked to do.
pub struct MockBackend {
    state: Mutex<MockState>,
    next_id: AtomicU32,
    release: Notify,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU32::new(0),
            release: Notify::new(),
        })
    }

    pub fn set_mode(&self, op: BackendOp, mode: FailureMode) {
        self.state.lock().unwrap().modes.insert(op, mode);
    }

    pub fn clear_mode(&self, op: BackendOp) {
        self.state.lock().unwrap().modes.remove(&op);
    }

    /// Lets one held call proceed.
    pub fn release_held(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self, op: BackendOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|&&call| call == op)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn inserted_locations(&self) -> Vec<NewLocationRecord> {
        self.state.lock().unwrap().locations.clone()
    }

    pub fn media_rows(&self) -> Vec<NewMediaRecord> {
        self.state.lock().unwrap().media_rows.clone()
    }

    pub fn vertex_rows(&self) -> Vec<VertexRow> {
        self.state.lock().unwrap().vertex_rows.clone()
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().blob_paths.clone()
    }

    async fn gate(&self, op: BackendOp) -> Result<(), BackendError> {
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(op);
            let mode = state.modes.get(&op).copied();
            if mode == Some(FailureMode::RejectOnce) {
                state.modes.remove(&op);
            }
            mode
        };
        match mode {
            None => Ok(()),
            Some(FailureMode::Transient) => Err(BackendError::network("connection reset by peer")),
            Some(FailureMode::Rejected | FailureMode::RejectOnce) => {
                Err(BackendError::rejected(422, "row rejected"))
            }
            Some(FailureMode::Hold) => {
                self.release.notified().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn insert_location(
        &self,
        record: &NewLocationRecord,
    ) -> Result<LocationRecord, BackendError> {
        self.gate(BackendOp::InsertLocation).await?;
        let id = format!("loc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.state.lock().unwrap().locations.push(record.clone());
        Ok(LocationRecord {
            id,
            client_local_id: Some(record.client_local_id.clone()),
            creator_id: Some(record.creator_id.clone()),
            location_name: record.location_name.clone(),
            status: Some(record.status),
            submitted_at: Some(record.submitted_at),
        })
    }

    async fn update_location(
        &self,
        id: &str,
        update: &LocationUpdate,
    ) -> Result<(), BackendError> {
        self.gate(BackendOp::UpdateLocation).await?;
        let detail = serde_json::to_string(update).unwrap();
        self.state
            .lock()
            .unwrap()
            .updates
            .push((id.to_string(), detail));
        Ok(())
    }

    async fn upload_blob(
        &self,
        path: &str,
        _bytes: Bytes,
        _content_type: &str,
    ) -> Result<String, BackendError> {
        self.gate(BackendOp::UploadBlob).await?;
        self.state.lock().unwrap().blob_paths.push(path.to_string());
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!("mock://public/{path}")
    }

    async fn insert_media_row(&self, record: &NewMediaRecord) -> Result<MediaRecord, BackendError> {
        self.gate(BackendOp::InsertMedia).await?;
        self.state.lock().unwrap().media_rows.push(record.clone());
        Ok(MediaRecord {
            id: format!("media-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            storage_path: Some(record.storage_path.clone()),
        })
    }

    async fn bulk_insert_vertices(
        &self,
        rows: &[VertexRow],
    ) -> Result<Vec<VertexRow>, BackendError> {
        self.gate(BackendOp::BulkInsertVertices).await?;
        self.state
            .lock()
            .unwrap()
            .vertex_rows
            .extend(rows.iter().cloned());
        Ok(rows.to_vec())
    }

    async fn query_locations_by_user(
        &self,
        _user_id: &str,
        _limit: u32,
    ) -> Result<Vec<LocationRecord>, BackendError> {
        self.gate(BackendOp::QueryLocations).await?;
        Ok(Vec::new())
    }
}

/// Everything a test needs, wired over one in-memory store.
pub struct Harness {
    pub session: DraftSession,
    pub queue: SyncQueue,
    pub backend: Arc<MockBackend>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let backend = MockBackend::new();
    let store_dyn: Arc<dyn KeyValueStore> = store.clone();
    let uploader = Uploader::new(backend.clone());
    let queue = SyncQueue::new(store_dyn.clone(), uploader.clone(), QueueConfig::default());
    let session = DraftSession::new(store_dyn, uploader, queue.clone());
    Harness {
        session,
        queue,
        backend,
        store,
    }
}

/// A second session over the same store, as after an app restart.
pub fn restarted_session(harness: &Harness) -> DraftSession {
    let store_dyn: Arc<dyn KeyValueStore> = harness.store.clone();
    let uploader = Uploader::new(harness.backend.clone());
    DraftSession::new(store_dyn, uploader, harness.queue.clone())
}

/// A fresh queue over the same store, as after an app restart. Call
/// `load` on it to restore the persisted items.
pub fn restarted_queue(harness: &Harness) -> SyncQueue {
    let store_dyn: Arc<dyn KeyValueStore> = harness.store.clone();
    let uploader = Uploader::new(harness.backend.clone());
    SyncQueue::new(store_dyn, uploader, QueueConfig::default())
}

/// Routes the engine's tracing output into the test harness. Safe to call
/// from every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsurvey=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Polls `check` every 10ms until it holds, for up to two seconds.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}

/// The GPS fix used across the scenarios: central Ho Chi Minh City.
pub fn hcmc_gps() -> GeoPoint {
    GeoPoint::new(106.7009, 10.7769)
}

/// Three boundary vertices, enough for a rough area.
pub fn triangle() -> Vec<Vertex> {
    vec![
        Vertex::new(0, 10.7769, 106.7009),
        Vertex::new(1, 10.7771, 106.7012),
        Vertex::new(2, 10.7767, 106.7014),
    ]
}

/// Writes a small fake JPEG under `dir` and returns a photo pointing at it.
pub fn photo_on_disk(dir: &Path, name: &str) -> Photo {
    let path = dir.join(name);
    std::fs::write(&path, b"\xff\xd8\xff\xe0 not a real jpeg").unwrap();
    Photo::new(path.display().to_string())
}

/// Like [`photo_on_disk`], but hands back the `file://` form that mobile
/// capture APIs produce.
pub fn photo_with_file_uri(dir: &Path, name: &str) -> Photo {
    let path = dir.join(name);
    std::fs::write(&path, b"\xff\xd8\xff\xe0 not a real jpeg").unwrap();
    Photo::new(format!("file://{}", path.display()))
}

/// A submittable bundle: GPS fix, one photo on disk, and a triangle.
pub fn full_bundle(dir: &Path, creator_id: &str) -> SurveyBundle {
    let mut bundle = SurveyBundle::new(SurveyDraft::new(creator_id));
    bundle.survey.gps_point = Some(hcmc_gps());
    bundle.photos.push(photo_on_disk(dir, "site.jpg"));
    bundle.vertices = triangle();
    bundle
}

pub fn vertices_job(location_id: &str) -> SyncJob {
    SyncJob::Vertices(VerticesJob {
        location_id: location_id.to_string(),
        vertices: triangle(),
    })
}

pub fn media_job(dir: &Path, location_id: &str, name: &str) -> SyncJob {
    SyncJob::Media(MediaJob {
        location_id: location_id.to_string(),
        photo: photo_on_disk(dir, name),
    })
}
