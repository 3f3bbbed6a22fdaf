//! Pinata implementation of [`PinningService`].

use super::{FileUpload, PinReceipt, PinRecord, PinningError, PinningService, Result, content_type_or_default};
use crate::config::PinataConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Body, Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Deserialize)]
struct PinListResponse {
    rows: Vec<PinataPin>,
}

#[derive(Debug, Deserialize)]
struct PinataPin {
    id: String,
    ipfs_pin_hash: String,
    size: u64,
    #[serde(default)]
    name: Option<String>,
    date_pinned: DateTime<Utc>,
    #[serde(default)]
    metadata: Option<PinataMetadata>,
}

#[derive(Debug, Deserialize)]
struct PinataMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    keyvalues: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinFileResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: Option<u64>,
    #[serde(default, rename = "isDuplicate")]
    is_duplicate: Option<bool>,
}

impl From<PinataPin> for PinRecord {
    fn from(pin: PinataPin) -> Self {
        let metadata_name = pin.metadata.and_then(|m| m.name).filter(|n| !n.is_empty());
        let name = metadata_name
            .or(pin.name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| pin.ipfs_pin_hash.clone());

        Self {
            id: pin.id,
            name,
            cid: pin.ipfs_pin_hash,
            size: pin.size,
            pinned_at: pin.date_pinned,
        }
    }
}

/// Client for the Pinata REST API.
pub struct PinataClient {
    client: Client,
    api_url: Url,
    jwt: Option<String>,
    request_timeout: Duration,
}

impl PinataClient {
    pub fn new(config: &PinataConfig) -> anyhow::Result<Self> {
        // No total timeout on the client itself: uploads of arbitrary size must not be cut off.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            jwt: config.jwt.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn jwt(&self) -> Result<&str> {
        self.jwt
            .as_deref()
            .ok_or(PinningError::NotConfigured { setting: "pinata.jwt" })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(ensure_slash(&self.api_url).join(path)?)
    }
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends with '/', so an API URL
/// configured as `http://host/prefix` must become `http://host/prefix/` before joining.
pub(crate) fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(PinningError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl PinningService for PinataClient {
    fn ensure_configured(&self) -> Result<()> {
        self.jwt().map(|_| ())
    }

    #[instrument(skip_all)]
    async fn list_pinned(&self) -> Result<Vec<PinRecord>> {
        let jwt = self.jwt()?;

        let mut url = self.endpoint("data/pinList")?;
        url.query_pairs_mut().append_pair("status", "pinned");
        debug!("Listing pins from {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(jwt)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let body_text = response.text().await?;
        let parsed: PinListResponse = serde_json::from_str(&body_text).map_err(|e| {
            tracing::debug!("Pin list response body was: {}", body_text);
            PinningError::Decode(format!("error decoding pin list: {}", e))
        })?;

        debug!("Pinning service returned {} pins", parsed.rows.len());
        Ok(parsed.rows.into_iter().map(PinRecord::from).collect())
    }

    #[instrument(skip_all, fields(file_name = %upload.file_name, content_type = %upload.content_type))]
    async fn pin_file(&self, upload: FileUpload) -> Result<PinReceipt> {
        let jwt = self.jwt()?;
        let url = self.endpoint("pinning/pinFileToIPFS")?;

        let content_type = content_type_or_default(&upload.content_type);
        let part = Part::stream(Body::wrap_stream(upload.body))
            .file_name(upload.file_name)
            .mime_str(content_type.as_ref())?;

        let mut form = Form::new().part("file", part);
        if let Some(name) = upload.display_name {
            form = form.text("pinataMetadata", serde_json::json!({ "name": name }).to_string());
        }

        let response = self.client.post(url).bearer_auth(jwt).multipart(form).send().await?;
        let response = error_for_status(response).await?;

        let body_text = response.text().await?;
        let parsed: PinFileResponse = serde_json::from_str(&body_text).map_err(|e| {
            tracing::debug!("Pin file response body was: {}", body_text);
            PinningError::Decode(format!("error decoding pin response: {}", e))
        })?;

        debug!(cid = %parsed.ipfs_hash, "File pinned");
        Ok(PinReceipt {
            cid: parsed.ipfs_hash,
            size: parsed.pin_size,
            is_duplicate: parsed.is_duplicate.unwrap_or(false),
        })
    }
}
