//! Remote backend surface.
//!
//! [`RemoteBackend`] is the seam between the sync engine and the survey
//! service: row inserts for locations, media metadata and vertices, blob
//! upload for photo bytes, and a read query for the submission history
//! screen. [`HttpBackend`] is the production implementation; tests swap in
//! scripted fakes.
//!
//! Error classification lives here because retry policy depends on it:
//! a [`BackendError::Network`] aborts a drain and costs no retry budget,
//! everything else burns one attempt.

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{GeoPoint, GeoPolygon, SurveyDraft, SurveyStatus};

#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never completed: no route, timeout, connection reset.
    /// Retrying later can succeed, so this never consumes retry budget.
    #[error("network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-success status. The request reached
    /// the service and was refused, so retrying the same payload counts
    /// against the item's budget.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered 2xx but the body was not what we expect.
    #[error("unexpected backend response: {message}")]
    InvalidResponse { message: String },
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// True for failures that say nothing about the payload, only about
    /// connectivity.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Row sent when inserting a survey location.
///
/// Field names are the backend's column names, hence snake_case JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLocationRecord {
    pub client_local_id: String,
    pub creator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_unit_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_use_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_point: Option<GeoPoint>,
    pub status: SurveyStatus,
    pub submitted_at: DateTime<Utc>,
}

impl NewLocationRecord {
    /// Maps a local draft onto the insert row. Status is forced to
    /// `pending` and a missing submission time defaults to now, so a row
    /// can never arrive at the backend claiming to be an unsubmitted draft.
    pub fn from_survey(survey: &SurveyDraft) -> Self {
        Self {
            client_local_id: survey.client_local_id.clone(),
            creator_id: survey.creator_id.clone(),
            location_name: survey.location_name.clone(),
            address: survey.address.clone(),
            admin_unit_code: survey.admin_unit_code.clone(),
            land_use_code: survey.land_use_code.clone(),
            object_type_code: survey.object_type_code.clone(),
            note: survey.note.clone(),
            gps_point: survey.gps_point.clone(),
            status: SurveyStatus::Pending,
            submitted_at: survey.submitted_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Location row as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    #[serde(default)]
    pub client_local_id: Option<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub status: Option<SurveyStatus>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing location row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<GeoPolygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SurveyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

/// Metadata row for an uploaded photo.
#[derive(Debug, Clone, Serialize)]
pub struct NewMediaRecord {
    pub location_id: String,
    pub storage_path: String,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_point: Option<GeoPoint>,
}

/// Media row as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    #[serde(default)]
    pub storage_path: Option<String>,
}

/// Boundary vertex row keyed by its remote location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRow {
    pub location_id: String,
    pub seq: u32,
    pub lat: f64,
    pub lng: f64,
}

/// Remote operations the sync engine depends on.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Inserts a location row and returns it with the backend-assigned id.
    async fn insert_location(
        &self,
        record: &NewLocationRecord,
    ) -> Result<LocationRecord, BackendError>;

    /// Applies a partial update to the location with the given remote id.
    async fn update_location(&self, id: &str, update: &LocationUpdate)
        -> Result<(), BackendError>;

    /// Uploads raw bytes to blob storage and returns the stored path.
    async fn upload_blob(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, BackendError>;

    /// Public URL serving the blob at `path`. Pure string composition.
    fn public_url(&self, path: &str) -> String;

    /// Inserts a media metadata row.
    async fn insert_media_row(&self, record: &NewMediaRecord) -> Result<MediaRecord, BackendError>;

    /// Inserts all vertex rows in one request and returns the echoed rows.
    async fn bulk_insert_vertices(
        &self,
        rows: &[VertexRow],
    ) -> Result<Vec<VertexRow>, BackendError>;

    /// Most recent locations created by `user_id`, newest first.
    async fn query_locations_by_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<LocationRecord>, BackendError>;
}
