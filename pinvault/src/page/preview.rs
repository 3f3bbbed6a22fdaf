//! Local file previews and the display helpers the page renders alongside them.

use super::LocalFile;
use std::collections::HashSet;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

/// How a file should be previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Image,
    Video,
    Audio,
    /// Anything else: shown as a generic file
    File,
}

impl PreviewKind {
    /// Classify a freshly selected file by its declared MIME type.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::File
        }
    }

    /// Classify a listed file by its name's extension, case-insensitively.
    ///
    /// `.ogg` is treated as video.
    pub fn from_file_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Self::File;
        };

        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Self::Image,
            "mp4" | "webm" | "ogg" => Self::Video,
            "mp3" | "wav" => Self::Audio,
            _ => Self::File,
        }
    }
}

/// Human readable size in base 1024: `0 Bytes`, `1.5 KB`, `2 MB`, up to TB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Abbreviated CID for display: first six and last four characters.
pub fn short_cid(cid: &str) -> String {
    let chars: Vec<char> = cid.chars().collect();
    if chars.len() <= 10 {
        return cid.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Creates and revokes locally addressable URLs for selected files.
pub trait PreviewStore: Send + Sync + 'static {
    fn create(&self, file: &LocalFile) -> String;
    fn revoke(&self, url: &str);
}

/// A live preview URL. Revoked exactly once, when dropped.
pub struct PreviewHandle<S: PreviewStore> {
    url: String,
    store: Arc<S>,
}

impl<S: PreviewStore> PreviewHandle<S> {
    pub fn create(store: &Arc<S>, file: &LocalFile) -> Self {
        let url = store.create(file);
        tracing::debug!(url = %url, file_name = %file.name, "Created preview");
        Self {
            url,
            store: Arc::clone(store),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<S: PreviewStore> Drop for PreviewHandle<S> {
    fn drop(&mut self) {
        tracing::debug!(url = %self.url, "Revoking preview");
        self.store.revoke(&self.url);
    }
}

impl<S: PreviewStore> std::fmt::Debug for PreviewHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle").field("url", &self.url).finish()
    }
}

/// In-process preview store handing out `blob:` style URLs.
#[derive(Debug, Default)]
pub struct MemoryPreviewStore {
    next_id: AtomicU64,
    live: Mutex<HashSet<String>>,
    revocations: AtomicU64,
}

impl MemoryPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs created and not yet revoked
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().map(|live| live.contains(url)).unwrap_or(false)
    }

    /// Total revoke calls, including any for unknown URLs
    pub fn revocations(&self) -> u64 {
        self.revocations.load(Ordering::SeqCst)
    }
}

impl PreviewStore for MemoryPreviewStore {
    fn create(&self, file: &LocalFile) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("blob:pinvault/{id}/{}", file.name);
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone());
        }
        url
    }

    fn revoke(&self, url: &str) {
        self.revocations.fetch_add(1, Ordering::SeqCst);
        let removed = self.live.lock().map(|mut live| live.remove(url)).unwrap_or(false);
        if !removed {
            tracing::warn!(url = %url, "Revoked a preview that was not live");
        }
    }
}
