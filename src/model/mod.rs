//! Data model for field surveys.
//!
//! Everything in this module is serialized with camelCase keys because the
//! drafts and the sync queue are persisted as JSON blobs in the key-value
//! store, and that format is shared with the mobile UI layer. Geometry types
//! follow GeoJSON conventions (`[longitude, latitude]` coordinate order).

mod geo;
mod photo;
mod survey;
mod vertex;

pub use geo::{GeoPoint, GeoPolygon};
pub use photo::Photo;
pub use survey::{SurveyDraft, SurveyPatch, SurveyStatus, SurveyStep};
pub use vertex::{closed_ring, polygon_from_vertices, Vertex};

use serde::{Deserialize, Serialize};

/// A survey draft together with its photos and boundary vertices.
///
/// This is the unit that gets persisted per draft and the payload carried by
/// a queued survey upload. Cloning it produces the immutable snapshot that
/// offline submission relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyBundle {
    pub survey: SurveyDraft,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl SurveyBundle {
    pub fn new(survey: SurveyDraft) -> Self {
        Self {
            survey,
            photos: Vec::new(),
            vertices: Vec::new(),
        }
    }
}
