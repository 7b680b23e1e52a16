//! Survey draft record and the patch type used to edit it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GeoPoint;

/// Lifecycle state of a survey record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    /// Being edited locally, never submitted.
    Draft,
    /// Submitted, waiting for the backend to accept it.
    Pending,
    /// Accepted by the backend.
    Synced,
    /// The backend rejected it.
    Failed,
}

/// The capture wizard step the user is on.
///
/// Kept in memory only. Reloading a draft restarts the wizard at the first
/// step with all previously captured data intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurveyStep {
    #[default]
    Details,
    Location,
    Photos,
    Boundary,
    Review,
}

impl SurveyStep {
    pub fn next(self) -> Self {
        match self {
            Self::Details => Self::Location,
            Self::Location => Self::Photos,
            Self::Photos => Self::Boundary,
            Self::Boundary => Self::Review,
            Self::Review => Self::Review,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Self::Details => Self::Details,
            Self::Location => Self::Details,
            Self::Photos => Self::Location,
            Self::Boundary => Self::Photos,
            Self::Review => Self::Boundary,
        }
    }
}

/// A locally captured survey of one land parcel.
///
/// `client_local_id` is assigned on the device and is the identity used for
/// draft storage keys and sync queue correlation. The backend assigns its own
/// id when the record is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDraft {
    pub client_local_id: String,
    pub creator_id: String,
    pub status: SurveyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_unit_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_point: Option<GeoPoint>,
    /// True whenever the draft carries at least three boundary vertices.
    pub has_rough_area: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SurveyDraft {
    /// Creates an empty draft owned by `creator_id` with a fresh local id.
    pub fn new(creator_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            client_local_id: Uuid::new_v4().to_string(),
            creator_id: creator_id.into(),
            status: SurveyStatus::Draft,
            location_name: None,
            address: None,
            admin_unit_code: None,
            land_use_code: None,
            object_type_code: None,
            note: None,
            gps_point: None,
            has_rough_area: false,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }
}

/// Partial update applied onto a [`SurveyDraft`].
///
/// `Some` fields overwrite, `None` fields leave the draft untouched. There is
/// deliberately no way to clear a field back to empty through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_unit_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_point: Option<GeoPoint>,
}

impl SurveyPatch {
    pub fn apply(self, draft: &mut SurveyDraft) {
        if let Some(value) = self.location_name {
            draft.location_name = Some(value);
        }
        if let Some(value) = self.address {
            draft.address = Some(value);
        }
        if let Some(value) = self.admin_unit_code {
            draft.admin_unit_code = Some(value);
        }
        if let Some(value) = self.land_use_code {
            draft.land_use_code = Some(value);
        }
        if let Some(value) = self.object_type_code {
            draft.object_type_code = Some(value);
        }
        if let Some(value) = self.note {
            draft.note = Some(value);
        }
        if let Some(value) = self.gps_point {
            draft.gps_point = Some(value);
        }
    }
}
