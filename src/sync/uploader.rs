//! Executes queued jobs against the remote backend.
//!
//! The uploader is shared by both submission paths: an online submit runs the
//! survey upload directly, an offline submit queues the same work for a later
//! drain. Either way the sequencing is identical, so "submit now" and "sync
//! later" cannot drift apart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::backend::{LocationUpdate, NewLocationRecord, NewMediaRecord, RemoteBackend, VertexRow};
use crate::model::{polygon_from_vertices, Photo, SurveyBundle, Vertex};

use super::SyncError;

/// Optional photo preprocessing before upload.
///
/// Implementations get the captured file and return the path of the file to
/// actually upload, typically a recompressed copy in the cache directory.
#[async_trait]
pub trait MediaCompressor: Send + Sync {
    async fn compress(&self, source: &Path) -> std::io::Result<PathBuf>;
}

#[derive(Clone)]
pub struct Uploader {
    backend: Arc<dyn RemoteBackend>,
    compressor: Option<Arc<dyn MediaCompressor>>,
}

impl Uploader {
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        Self {
            backend,
            compressor: None,
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn MediaCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn backend(&self) -> &Arc<dyn RemoteBackend> {
        &self.backend
    }

    /// Runs one queued job to completion.
    pub(crate) async fn run(&self, job: &super::SyncJob) -> Result<(), SyncError> {
        match job {
            super::SyncJob::Survey(bundle) => {
                self.upload_survey(bundle).await?;
                Ok(())
            }
            super::SyncJob::Media(media) => {
                self.upload_media(&media.location_id, &media.photo).await
            }
            super::SyncJob::Vertices(vertices) => {
                self.upload_vertices(&vertices.location_id, &vertices.vertices)
                    .await
            }
        }
    }

    /// Uploads a complete survey and returns the backend-assigned location
    /// id.
    ///
    /// The location row is the commit point: once it is inserted the survey
    /// exists remotely, and photo or boundary problems must not fail the
    /// whole upload, or a retry would insert the row a second time. Those
    /// follow-up failures are logged and skipped instead.
    pub async fn upload_survey(&self, bundle: &SurveyBundle) -> Result<String, SyncError> {
        let record = NewLocationRecord::from_survey(&bundle.survey);
        let inserted = self.backend.insert_location(&record).await?;
        info!(
            location_id = %inserted.id,
            client_local_id = %bundle.survey.client_local_id,
            "location row committed"
        );

        for photo in &bundle.photos {
            if let Err(error) = self.upload_media(&inserted.id, photo).await {
                warn!(
                    photo_id = %photo.id,
                    error = %error,
                    "photo upload failed during survey sync, continuing"
                );
            }
        }

        if bundle.vertices.len() >= 3 {
            match self.upload_vertices(&inserted.id, &bundle.vertices).await {
                Ok(()) => {
                    let update = LocationUpdate {
                        polygon: Some(polygon_from_vertices(&bundle.vertices)),
                        ..Default::default()
                    };
                    if let Err(error) = self.backend.update_location(&inserted.id, &update).await {
                        warn!(
                            location_id = %inserted.id,
                            error = %error,
                            "polygon patch failed, location left without boundary"
                        );
                    }
                }
                Err(error) => {
                    warn!(
                        location_id = %inserted.id,
                        error = %error,
                        "vertex upload failed during survey sync"
                    );
                }
            }
        }

        Ok(inserted.id)
    }

    /// Uploads one photo: bytes to blob storage, then the metadata row.
    pub async fn upload_media(&self, location_id: &str, photo: &Photo) -> Result<(), SyncError> {
        let captured = local_photo_path(&photo.file_uri);
        let source = match &self.compressor {
            Some(compressor) => compressor.compress(&captured).await?,
            None => captured,
        };

        if !tokio::fs::try_exists(&source).await? {
            return Err(SyncError::FileNotFound {
                path: source.display().to_string(),
            });
        }

        let data = tokio::fs::read(&source).await?;
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo.jpg");
        // Namespaced by location and keyed by photo id, so two captures
        // with the same basename cannot overwrite each other.
        let storage_path = format!("{location_id}/{}_{file_name}", photo.id);

        let stored_path = self
            .backend
            .upload_blob(&storage_path, Bytes::from(data), content_type_for(file_name))
            .await?;

        self.backend
            .insert_media_row(&NewMediaRecord {
                location_id: location_id.to_string(),
                storage_path: stored_path,
                captured_at: photo.captured_at,
                note: photo.note.clone(),
                gps_point: photo.gps_point.clone(),
            })
            .await?;
        Ok(())
    }

    /// Inserts every boundary vertex for a location in one request.
    pub async fn upload_vertices(
        &self,
        location_id: &str,
        vertices: &[Vertex],
    ) -> Result<(), SyncError> {
        let rows: Vec<VertexRow> = vertices
            .iter()
            .map(|vertex| VertexRow {
                location_id: location_id.to_string(),
                seq: vertex.seq,
                lat: vertex.lat,
                lng: vertex.lng,
            })
            .collect();
        self.backend.bulk_insert_vertices(&rows).await?;
        Ok(())
    }
}

/// Filesystem path for a captured photo. Mobile capture APIs hand out
/// `file://` URIs while cached copies are plain paths; both name the same
/// file on disk.
fn local_photo_path(file_uri: &str) -> PathBuf {
    match file_uri.strip_prefix("file://") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(file_uri),
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for("p1.jpg"), "image/jpeg");
        assert_eq!(content_type_for("p1.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("p1.png"), "image/png");
        assert_eq!(content_type_for("scan.heic"), "image/heic");
        assert_eq!(content_type_for("mystery"), "application/octet-stream");
    }

    #[test]
    fn test_file_uri_scheme_maps_to_a_plain_path() {
        assert_eq!(
            local_photo_path("file:///data/photos/p1.jpg"),
            PathBuf::from("/data/photos/p1.jpg")
        );
        assert_eq!(
            local_photo_path("/cache/compressed/p1.jpg"),
            PathBuf::from("/cache/compressed/p1.jpg")
        );
    }
}
