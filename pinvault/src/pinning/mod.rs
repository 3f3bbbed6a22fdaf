//! Pinning service abstraction layer
//!
//! This module defines the `PinningService` trait, the seam between the HTTP handlers and the
//! remote service that actually stores content on IPFS. The only production implementation is
//! [`pinata::PinataClient`]. The service is the system of record: nothing here caches or persists
//! pins between requests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use mime_guess::mime::Mime;
use std::{pin::Pin, sync::Arc};

use crate::config::PinataConfig;

pub mod pinata;

/// Create the pinning service from configuration
///
/// This is the single point where configuration is turned into a client. It runs once at startup
/// and the result is shared through [`crate::AppState`].
pub fn create_service(config: &PinataConfig) -> anyhow::Result<Arc<dyn PinningService>> {
    Ok(Arc::new(pinata::PinataClient::new(config)?))
}

/// Result type for pinning operations
pub type Result<T> = std::result::Result<T, PinningError>;

/// Errors that can occur while talking to the pinning service
#[derive(Debug, thiserror::Error)]
pub enum PinningError {
    /// A credential required to authenticate is missing. Raised before any network I/O.
    #[error("{setting} is not configured")]
    NotConfigured { setting: &'static str },

    #[error("Pinning service returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Pinning service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected pinning service response: {0}")]
    Decode(String),

    #[error("Invalid pinning service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Stream of file bytes handed to the pinning service.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Parse a declared MIME type, falling back to `application/octet-stream` when it is empty or
/// malformed.
pub fn content_type_or_default(declared: &str) -> Mime {
    declared
        .trim()
        .parse::<Mime>()
        .unwrap_or(mime_guess::mime::APPLICATION_OCTET_STREAM)
}

/// A file to pin, with the metadata that travels alongside it.
pub struct FileUpload {
    /// Original file name as submitted by the client
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    /// Optional display name stored as pin metadata
    pub display_name: Option<String>,
    /// File contents, streamed through without buffering
    pub body: ByteStream,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// A pin as reported by the pinning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    /// Identifier of the pin record, unique per upload call
    pub id: String,
    /// Display name, already resolved from metadata
    pub name: String,
    /// Content identifier
    pub cid: String,
    /// Size in bytes
    pub size: u64,
    /// When the content was pinned
    pub pinned_at: DateTime<Utc>,
}

/// What the pinning service hands back after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReceipt {
    pub cid: String,
    pub size: Option<u64>,
    /// Set when the service already held this content
    pub is_duplicate: bool,
}

/// Abstract pinning service interface
#[async_trait]
pub trait PinningService: Send + Sync {
    /// Fail fast, without network I/O, when credentials needed by every call are missing.
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// List currently pinned content, in the order the service returns it.
    async fn list_pinned(&self) -> Result<Vec<PinRecord>>;

    /// Pin a new file.
    ///
    /// Not idempotent: pinning identical bytes twice may create two records with distinct ids
    /// and the same CID.
    async fn pin_file(&self, upload: FileUpload) -> Result<PinReceipt>;
}

/// Public gateway used to build access URLs for pinned content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    host: String,
}

impl Gateway {
    /// Build a gateway from a configured hostname.
    ///
    /// A leading `http://`/`https://` and trailing slashes are stripped. Returns `None` for a
    /// blank value.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let host = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if host.is_empty() {
            None
        } else {
            Some(Self { host: host.to_string() })
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `https://{host}/ipfs/{cid}`
    pub fn access_url(&self, cid: &str) -> String {
        format!("https://{}/ipfs/{}", self.host, cid)
    }
}
