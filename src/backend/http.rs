//! REST implementation of [`RemoteBackend`].
//!
//! Talks to the survey service's auto-generated REST layer: table writes go
//! through `/rest/v1/<table>` with `Prefer: return=representation` so inserts
//! echo the stored rows, and photo bytes go through `/storage/v1/object`.
//! Authentication is a static API key sent both as `apikey` and bearer token.

use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::config::AppConfig;

use super::{
    BackendError, LocationRecord, LocationUpdate, MediaRecord, NewLocationRecord, NewMediaRecord,
    RemoteBackend, VertexRow,
};

const LOCATIONS_TABLE: &str = "survey_locations";
const MEDIA_TABLE: &str = "survey_media";
const VERTICES_TABLE: &str = "survey_vertices";

pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.backend_url, &config.api_key, &config.storage_bucket)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    /// Maps a reqwest failure onto our error split: transport problems are
    /// transient, a mangled body is not.
    fn classify(error: reqwest::Error) -> BackendError {
        if error.is_decode() || error.is_builder() {
            BackendError::invalid_response(error.to_string())
        } else {
            BackendError::network(error.to_string())
        }
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        Err(BackendError::rejected(status.as_u16(), message))
    }

    /// POSTs one row and unwraps the single-element representation array the
    /// REST layer answers with.
    async fn insert_one<T, R>(&self, table: &str, row: &T) -> Result<R, BackendError>
    where
        T: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", HeaderValue::from_static("return=representation"))
            .json(row)
            .send()
            .await
            .map_err(Self::classify)?;
        let mut rows: Vec<R> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(Self::classify)?;
        rows.pop()
            .ok_or_else(|| BackendError::invalid_response("insert returned no rows"))
    }
}

#[async_trait::async_trait]
impl RemoteBackend for HttpBackend {
    async fn insert_location(
        &self,
        record: &NewLocationRecord,
    ) -> Result<LocationRecord, BackendError> {
        debug!(client_local_id = %record.client_local_id, "inserting location row");
        self.insert_one(LOCATIONS_TABLE, record).await
    }

    async fn update_location(
        &self,
        id: &str,
        update: &LocationUpdate,
    ) -> Result<(), BackendError> {
        let response = self
            .authed(self.client.patch(self.rest_url(LOCATIONS_TABLE)))
            .query(&[("id", format!("eq.{id}"))])
            .json(update)
            .send()
            .await
            .map_err(Self::classify)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_blob(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, BackendError> {
        debug!(path, size = bytes.len(), "uploading blob");
        let response = self
            .authed(self.client.post(self.object_url(path)))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(Self::classify)?;
        Self::check(response).await?;
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn insert_media_row(&self, record: &NewMediaRecord) -> Result<MediaRecord, BackendError> {
        self.insert_one(MEDIA_TABLE, record).await
    }

    async fn bulk_insert_vertices(
        &self,
        rows: &[VertexRow],
    ) -> Result<Vec<VertexRow>, BackendError> {
        let response = self
            .authed(self.client.post(self.rest_url(VERTICES_TABLE)))
            .header("Prefer", HeaderValue::from_static("return=representation"))
            .json(&rows)
            .send()
            .await
            .map_err(Self::classify)?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(Self::classify)
    }

    async fn query_locations_by_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<LocationRecord>, BackendError> {
        let response = self
            .authed(self.client.get(self.rest_url(LOCATIONS_TABLE)))
            .query(&[
                ("creator_id", format!("eq.{user_id}")),
                ("order", "submitted_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(Self::classify)?;
        let response = Self::check(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        response.json().await.map_err(Self::classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        let backend = HttpBackend::new("https://api.example.test//", "key", "survey-media");
        assert_eq!(
            backend.rest_url("survey_locations"),
            "https://api.example.test/rest/v1/survey_locations"
        );
    }

    #[test]
    fn test_public_url_shape() {
        let backend = HttpBackend::new("https://api.example.test", "key", "survey-media");
        assert_eq!(
            backend.public_url("loc-1/p1.jpg"),
            "https://api.example.test/storage/v1/object/public/survey-media/loc-1/p1.jpg"
        );
    }

    #[test]
    fn test_object_url_includes_bucket() {
        let backend = HttpBackend::new("https://api.example.test", "key", "survey-media");
        assert_eq!(
            backend.object_url("loc-1/p1.jpg"),
            "https://api.example.test/storage/v1/object/survey-media/loc-1/p1.jpg"
        );
    }
}
