//! Client for the proxy's `/api/files` operations.

use super::{LocalFile, PageError};
use crate::api::models::files::{PinnedFile, UploadResponse};
use crate::errors::ErrorBody;
use crate::pinning::{content_type_or_default, pinata::ensure_slash};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use std::time::Duration;
use url::Url;

/// The two proxy operations the page invokes.
#[async_trait]
pub trait FilesApi: Send + Sync {
    async fn list_files(&self) -> Result<Vec<PinnedFile>, PageError>;
    async fn upload_file(&self, file: &LocalFile) -> Result<UploadResponse, PageError>;
}

/// [`FilesApi`] over HTTP against a running proxy.
#[derive(Debug, Clone)]
pub struct HttpFilesApi {
    client: Client,
    files_url: Url,
}

impl HttpFilesApi {
    /// `base_url` is where the proxy is served, e.g. `http://localhost:3000`.
    pub fn new(base_url: &Url) -> Result<Self, PageError> {
        let client = Client::builder().connect_timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            files_url: ensure_slash(base_url).join("api/files")?,
        })
    }
}

/// Turn a non-success response into an error, keeping the proxy's `{error}` message if present.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, PageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(PageError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl FilesApi for HttpFilesApi {
    #[tracing::instrument(skip_all)]
    async fn list_files(&self) -> Result<Vec<PinnedFile>, PageError> {
        let response = self
            .client
            .get(self.files_url.clone())
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }

    #[tracing::instrument(skip_all, fields(file_name = %file.name))]
    async fn upload_file(&self, file: &LocalFile) -> Result<UploadResponse, PageError> {
        let content_type = content_type_or_default(&file.mime_type);
        let part = Part::stream(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(content_type.as_ref())?;
        let form = Form::new().part("file", part);

        let response = self.client.post(self.files_url.clone()).multipart(form).send().await?;
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }
}
