use crate::pinning::{Gateway, PinRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A previously pinned file, as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PinnedFile {
    /// Pin record identifier assigned by the pinning service
    pub id: String,
    /// Display name: metadata name if set, else the original filename
    pub name: String,
    /// Content identifier (CID)
    pub ipfs_hash: String,
    /// Size in bytes
    pub size: u64,
    pub date_pinned: DateTime<Utc>,
    /// Public gateway URL, `https://{gateway}/ipfs/{ipfsHash}`
    pub url: String,
}

impl PinnedFile {
    pub fn from_record(record: PinRecord, gateway: &Gateway) -> Self {
        let url = gateway.access_url(&record.cid);
        Self {
            id: record.id,
            name: record.name,
            ipfs_hash: record.cid,
            size: record.size,
            date_pinned: record.pinned_at,
            url,
        }
    }
}

/// Response for a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Content identifier assigned by the pinning service
    pub ipfs_hash: String,
    /// Public gateway URL for the new pin
    pub url: String,
}

impl UploadResponse {
    pub fn new(cid: String, gateway: &Gateway) -> Self {
        let url = gateway.access_url(&cid);
        Self { ipfs_hash: cid, url }
    }
}
