//! Photo attachments captured during a survey.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GeoPoint;

/// A photo taken while surveying a parcel.
///
/// `file_uri` points at the file on the device. The bytes themselves are
/// never held in memory here; the uploader reads them only when the photo is
/// pushed to remote storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub file_uri: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_point: Option<GeoPoint>,
}

impl Photo {
    pub fn new(file_uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_uri: file_uri.into(),
            captured_at: Utc::now(),
            note: None,
            gps_point: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_gps(mut self, point: GeoPoint) -> Self {
        self.gps_point = Some(point);
        self
    }

    /// Final path component of `file_uri`, used to name the uploaded object.
    pub fn file_name(&self) -> &str {
        self.file_uri
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("photo.jpg")
    }
}
