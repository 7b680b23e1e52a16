//! # Draft Lifecycle
//!
//! Owns the survey being captured right now and its journey from first edit
//! to submission.
//!
//! ## Flow
//!
//! - **Capture**: [`DraftSession::start_new_survey`] opens a fresh draft in
//!   memory; every later mutation persists the whole draft, so the app can
//!   die at any point and lose at most the current keystroke
//! - **Resume**: [`DraftSession::load_draft`] restores a persisted draft;
//!   the wizard restarts at the first step with the captured data intact
//! - **Submit**: [`DraftSession::submit_survey`] checks preconditions, marks
//!   the draft pending, then either uploads immediately or hands a snapshot
//!   to the sync queue
//!
//! One session means one draft open at a time, which is exactly the mobile
//! capture flow. The drafts archive ([`DraftSession::list_saved_drafts`])
//! exists so officers can park a survey and finish it days later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{
    Photo, SurveyBundle, SurveyDraft, SurveyPatch, SurveyStatus, SurveyStep, Vertex,
};
use crate::storage::{keys, KeyValueStore, StorageError};
use crate::sync::{SyncError, SyncJob, SyncQueue, Uploader};
use crate::validation::{SurveyValidator, ValidationIssue};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no active survey draft")]
    NoActiveDraft,

    #[error("draft not found: {survey_id}")]
    DraftNotFound { survey_id: String },

    #[error("survey has no GPS point")]
    MissingGpsPoint,

    #[error("survey has no photos")]
    NoPhotos,

    #[error("survey failed validation ({} issue(s))", .0.len())]
    Invalid(Vec<ValidationIssue>),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Backend-assigned id, present only when the upload ran immediately.
    pub location_id: Option<String>,
    /// True when the survey went to the sync queue instead.
    pub queued: bool,
}

/// One row in the saved-drafts list.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftSummary {
    pub client_local_id: String,
    pub location_name: Option<String>,
    pub status: SurveyStatus,
    pub saved_at: DateTime<Utc>,
    pub photo_count: usize,
    pub vertex_count: usize,
}

/// Persisted form of a draft: the bundle plus the save timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftEnvelope {
    #[serde(flatten)]
    bundle: SurveyBundle,
    saved_at: DateTime<Utc>,
}

/// The capture workflow around a single active draft.
pub struct DraftSession {
    store: Arc<dyn KeyValueStore>,
    uploader: Uploader,
    queue: SyncQueue,
    validator: Option<Arc<dyn SurveyValidator>>,
    current: Option<SurveyBundle>,
    step: SurveyStep,
}

impl DraftSession {
    pub fn new(store: Arc<dyn KeyValueStore>, uploader: Uploader, queue: SyncQueue) -> Self {
        Self {
            store,
            uploader,
            queue,
            validator: None,
            current: None,
            step: SurveyStep::default(),
        }
    }

    /// Adds deployment-specific submission rules on top of the built-in
    /// preconditions.
    pub fn with_validator(mut self, validator: Arc<dyn SurveyValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Opens a fresh draft for `creator_id`, replacing any active one.
    ///
    /// Nothing is persisted yet; the first mutation writes the draft. An
    /// abandoned untouched draft therefore leaves no trace.
    pub fn start_new_survey(&mut self, creator_id: &str) -> &SurveyDraft {
        let survey = SurveyDraft::new(creator_id);
        info!(client_local_id = %survey.client_local_id, "started new survey draft");
        self.step = SurveyStep::default();
        let bundle = self.current.insert(SurveyBundle::new(survey));
        &bundle.survey
    }

    pub fn current_survey(&self) -> Option<&SurveyDraft> {
        self.current.as_ref().map(|bundle| &bundle.survey)
    }

    pub fn current_photos(&self) -> &[Photo] {
        self.current
            .as_ref()
            .map(|bundle| bundle.photos.as_slice())
            .unwrap_or(&[])
    }

    pub fn current_vertices(&self) -> &[Vertex] {
        self.current
            .as_ref()
            .map(|bundle| bundle.vertices.as_slice())
            .unwrap_or(&[])
    }

    pub fn step(&self) -> SurveyStep {
        self.step
    }

    /// Moves the wizard. Pure in-memory state; never persisted.
    pub fn set_step(&mut self, step: SurveyStep) {
        self.step = step;
    }

    /// Merges `patch` into the active draft and persists it.
    pub async fn update_survey(&mut self, patch: SurveyPatch) -> Result<(), DraftError> {
        let bundle = self.current.as_mut().ok_or(DraftError::NoActiveDraft)?;
        patch.apply(&mut bundle.survey);
        bundle.survey.updated_at = Utc::now();
        self.save_draft().await
    }

    /// Appends a photo and persists the draft.
    pub async fn add_photo(&mut self, photo: Photo) -> Result<(), DraftError> {
        let bundle = self.current.as_mut().ok_or(DraftError::NoActiveDraft)?;
        debug!(photo_id = %photo.id, "photo attached to draft");
        bundle.photos.push(photo);
        bundle.survey.updated_at = Utc::now();
        self.save_draft().await
    }

    /// Removes the photo with the given id. An unknown id changes nothing,
    /// not even the updated-at stamp.
    pub async fn remove_photo(&mut self, photo_id: &str) -> Result<(), DraftError> {
        let bundle = self.current.as_mut().ok_or(DraftError::NoActiveDraft)?;
        let before = bundle.photos.len();
        bundle.photos.retain(|photo| photo.id != photo_id);
        if bundle.photos.len() == before {
            return Ok(());
        }
        bundle.survey.updated_at = Utc::now();
        self.save_draft().await
    }

    /// Replaces the boundary and recomputes the rough-area flag: three or
    /// more vertices set it, fewer clear it.
    pub async fn set_vertices(&mut self, vertices: Vec<Vertex>) -> Result<(), DraftError> {
        let bundle = self.current.as_mut().ok_or(DraftError::NoActiveDraft)?;
        bundle.survey.has_rough_area = vertices.len() >= 3;
        bundle.vertices = vertices;
        bundle.survey.updated_at = Utc::now();
        self.save_draft().await
    }

    /// Persists the active draft under its storage key.
    pub async fn save_draft(&self) -> Result<(), DraftError> {
        let bundle = self.current.as_ref().ok_or(DraftError::NoActiveDraft)?;
        let envelope = DraftEnvelope {
            bundle: bundle.clone(),
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_string(&envelope)?;
        self.store
            .set(&keys::draft_key(&bundle.survey.client_local_id), &raw)
            .await?;
        debug!(client_local_id = %bundle.survey.client_local_id, "draft persisted");
        Ok(())
    }

    /// Restores a persisted draft as the active one. A corrupt entry
    /// surfaces as a serialization error rather than a silently empty
    /// draft.
    pub async fn load_draft(&mut self, survey_id: &str) -> Result<(), DraftError> {
        let raw = self
            .store
            .get(&keys::draft_key(survey_id))
            .await?
            .ok_or_else(|| DraftError::DraftNotFound {
                survey_id: survey_id.to_string(),
            })?;
        let envelope: DraftEnvelope = serde_json::from_str(&raw)?;
        info!(client_local_id = %survey_id, "draft restored");
        self.current = Some(envelope.bundle);
        self.step = SurveyStep::default();
        Ok(())
    }

    /// Drops the active draft and deletes its persisted entry.
    pub async fn clear_current(&mut self) -> Result<(), DraftError> {
        if let Some(bundle) = self.current.take() {
            self.store
                .remove(&keys::draft_key(&bundle.survey.client_local_id))
                .await?;
            debug!(client_local_id = %bundle.survey.client_local_id, "draft cleared");
        }
        self.step = SurveyStep::default();
        Ok(())
    }

    /// Summaries of every persisted draft, most recently saved first.
    /// Unreadable entries are skipped so one corrupt draft cannot hide the
    /// rest of the archive.
    pub async fn list_saved_drafts(&self) -> Result<Vec<DraftSummary>, DraftError> {
        let draft_keys = self.store.keys_with_prefix(keys::DRAFT_PREFIX).await?;
        let mut summaries = Vec::with_capacity(draft_keys.len());
        for key in draft_keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<DraftEnvelope>(&raw) {
                Ok(envelope) => summaries.push(DraftSummary {
                    client_local_id: envelope.bundle.survey.client_local_id.clone(),
                    location_name: envelope.bundle.survey.location_name.clone(),
                    status: envelope.bundle.survey.status,
                    saved_at: envelope.saved_at,
                    photo_count: envelope.bundle.photos.len(),
                    vertex_count: envelope.bundle.vertices.len(),
                }),
                Err(error) => {
                    warn!(key = %key, error = %error, "skipping unreadable draft entry");
                }
            }
        }
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    /// Deletes a persisted draft. Deleting the active one also closes it.
    pub async fn delete_draft(&mut self, survey_id: &str) -> Result<(), DraftError> {
        let is_active = self
            .current
            .as_ref()
            .is_some_and(|bundle| bundle.survey.client_local_id == survey_id);
        if is_active {
            return self.clear_current().await;
        }
        self.store.remove(&keys::draft_key(survey_id)).await?;
        Ok(())
    }

    /// Submits the active draft.
    ///
    /// Preconditions run first and a failed one leaves every piece of state
    /// untouched: a GPS fix, at least one photo, and the injected validator
    /// if any. Then the draft is marked pending, persisted, and either
    /// uploaded now (`is_online`) or snapshotted into the sync queue.
    ///
    /// The draft entry survives an online submission too; it is cleaned up
    /// by the caller via [`clear_current`](Self::clear_current) once the UI
    /// has shown the result, or by the queue after a drained survey job.
    pub async fn submit_survey(&mut self, is_online: bool) -> Result<SubmitOutcome, DraftError> {
        {
            let bundle = self.current.as_ref().ok_or(DraftError::NoActiveDraft)?;
            if bundle.survey.gps_point.is_none() {
                return Err(DraftError::MissingGpsPoint);
            }
            if bundle.photos.is_empty() {
                return Err(DraftError::NoPhotos);
            }
            if let Some(validator) = &self.validator {
                validator
                    .validate(&bundle.survey)
                    .map_err(DraftError::Invalid)?;
            }
        }

        let now = Utc::now();
        let snapshot = {
            let Some(bundle) = self.current.as_mut() else {
                return Err(DraftError::NoActiveDraft);
            };
            bundle.survey.status = SurveyStatus::Pending;
            bundle.survey.submitted_at = Some(now);
            bundle.survey.updated_at = now;
            bundle.clone()
        };
        self.save_draft().await?;

        if is_online {
            let location_id = self.uploader.upload_survey(&snapshot).await?;
            info!(
                client_local_id = %snapshot.survey.client_local_id,
                location_id = %location_id,
                "survey submitted"
            );
            Ok(SubmitOutcome {
                location_id: Some(location_id),
                queued: false,
            })
        } else {
            let survey_id = snapshot.survey.client_local_id.clone();
            self.queue
                .enqueue(survey_id.clone(), SyncJob::Survey(snapshot))
                .await?;
            info!(client_local_id = %survey_id, "survey queued for sync");
            Ok(SubmitOutcome {
                location_id: None,
                queued: true,
            })
        }
    }
}
