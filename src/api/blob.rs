use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::client::{read_json, ApiError};
use super::UploadedBlob;
use crate::utils::url::construct_api_url;

/// A file to store under `pathname` (e.g. `{projectId}/config.json`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub pathname: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(pathname: impl Into<String>, content_type: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            pathname: pathname.into(),
            content_type: content_type.to_string(),
            bytes: bytes.into(),
        }
    }
}

/// Public blob storage: anonymous reads, uploads through the service.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when the blob does not exist or the store answers with any
    /// other non-success status.
    async fn fetch_text(&self, path: &str) -> Result<Option<String>, ApiError>;
    async fn upload(&self, upload: Upload) -> Result<UploadedBlob, ApiError>;
}

#[derive(Clone)]
pub struct BlobClient {
    client: reqwest::Client,
    blob_base_url: String,
    upload_url: String,
    token: Option<String>,
}

impl BlobClient {
    pub fn new(
        client: reqwest::Client,
        blob_base_url: impl Into<String>,
        upload_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            blob_base_url: blob_base_url.into(),
            upload_url: upload_url.into(),
            token,
        }
    }
}

#[async_trait]
impl BlobStore for BlobClient {
    async fn fetch_text(&self, path: &str) -> Result<Option<String>, ApiError> {
        let url = construct_api_url(&self.blob_base_url, path);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "blob not available");
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }

    async fn upload(&self, upload: Upload) -> Result<UploadedBlob, ApiError> {
        let Upload {
            pathname,
            content_type,
            bytes,
        } = upload;
        debug!(%pathname, size = bytes.len(), "uploading blob");

        let part = Part::bytes(bytes)
            .file_name(pathname)
            .mime_str(&content_type)?;
        let request = self
            .client
            .post(&self.upload_url)
            .multipart(Form::new().part("file", part));
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        read_json(request.send().await?).await
    }
}
