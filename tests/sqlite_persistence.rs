//! End-to-end persistence over the SQLite store
//!
//! The in-memory suites pin the engine semantics; this one proves the same
//! flows survive a real process restart by closing and reopening a store
//! on disk.

mod common;

use std::sync::Arc;

use common::{eventually, hcmc_gps, photo_on_disk, triangle, BackendOp, MockBackend};
use fieldsurvey::draft::DraftSession;
use fieldsurvey::model::SurveyPatch;
use fieldsurvey::storage::{KeyValueStore, SqliteStore};
use fieldsurvey::sync::{QueueConfig, SyncQueue, Uploader};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_offline_work_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("survey.db");
    let backend = MockBackend::new();

    // First run: capture a survey offline and submit it into the queue.
    let survey_id = {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let uploader = Uploader::new(backend.clone());
        let queue = SyncQueue::new(store.clone(), uploader.clone(), QueueConfig::default());
        let mut session = DraftSession::new(store, uploader, queue.clone());

        let survey_id = session.start_new_survey("user-123").client_local_id.clone();
        session
            .update_survey(SurveyPatch {
                location_name: Some("Parcel 17".to_string()),
                gps_point: Some(hcmc_gps()),
                ..Default::default()
            })
            .await
            .unwrap();
        session
            .add_photo(photo_on_disk(dir.path(), "site.jpg"))
            .await
            .unwrap();
        session.set_vertices(triangle()).await.unwrap();

        let outcome = session.submit_survey(false).await.unwrap();
        assert!(outcome.queued);
        assert_eq!(queue.len().await, 1);
        survey_id
    };
    assert_eq!(backend.total_calls(), 0);

    // Second run: everything is restored from the database file.
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&db_path).await.unwrap());
    let uploader = Uploader::new(backend.clone());
    let queue = SyncQueue::new(store.clone(), uploader.clone(), QueueConfig::default());
    queue.load().await.unwrap();
    assert_eq!(queue.len().await, 1);

    let session = DraftSession::new(store.clone(), uploader, queue.clone());
    let summaries = session.list_saved_drafts().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].client_local_id, survey_id);
    assert_eq!(summaries[0].photo_count, 1);
    assert_eq!(summaries[0].vertex_count, 3);

    // Connectivity returns: the queue drains and cleans up the local draft.
    queue.set_online_status(true).await;
    assert!(eventually(|| async { queue.is_empty().await && !queue.is_syncing() }).await);

    assert_eq!(backend.calls(BackendOp::InsertLocation), 1);
    assert_eq!(backend.calls(BackendOp::UploadBlob), 1);
    assert_eq!(backend.calls(BackendOp::BulkInsertVertices), 1);
    assert!(session.list_saved_drafts().await.unwrap().is_empty());
}
