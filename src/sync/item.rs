//! Queue item and job payload types.
//!
//! Queued jobs are dispatched on the [`SyncJob`] enum, so adding a job kind
//! means adding a variant and the compiler points at every match that needs
//! updating. The serialized form is part of the on-device wire format:
//! `type` carries the job kind, `data` the payload, and both sit flattened
//! inside the item alongside its bookkeeping fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Photo, SurveyBundle, Vertex};

/// Work requested while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SyncJob {
    /// Full survey upload: location row, then photos, then boundary.
    Survey(SurveyBundle),
    /// One photo for an already synced location.
    Media(MediaJob),
    /// Boundary vertices for an already synced location.
    Vertices(VerticesJob),
}

impl SyncJob {
    /// The `type` tag used in item ids and the persisted form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Survey(_) => "survey",
            Self::Media(_) => "media",
            Self::Vertices(_) => "vertices",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaJob {
    /// Remote id of the location the photo belongs to.
    pub location_id: String,
    pub photo: Photo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticesJob {
    /// Remote id of the location the boundary belongs to.
    pub location_id: String,
    pub vertices: Vec<Vertex>,
}

/// One entry in the persisted sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    pub id: String,
    /// Client-local id of the survey this item serves.
    pub survey_id: String,
    #[serde(flatten)]
    pub job: SyncJob,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncQueueItem {
    /// Ids start with a readable `{kind}_{survey}_{millis}` prefix for log
    /// grepping, plus a random suffix: the millisecond clock alone collides
    /// for jobs queued back to back, and completion handling needs every id
    /// to name exactly one item.
    pub(crate) fn new(survey_id: String, job: SyncJob, max_retries: u32) -> Self {
        let created_at = Utc::now();
        let id = format!(
            "{}_{}_{}_{}",
            job.kind(),
            survey_id,
            created_at.timestamp_millis(),
            Uuid::new_v4().simple()
        );
        Self {
            id,
            survey_id,
            job,
            retry_count: 0,
            max_retries,
            last_attempt: None,
            error: None,
            created_at,
        }
    }

    /// True once the item has burned its whole retry budget. Exhausted items
    /// stay queued but are skipped until someone resets them.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
