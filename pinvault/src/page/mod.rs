//! Upload page controller.
//!
//! [`PageController`] holds the state behind a two-tab page: an *explore* view listing pinned
//! files and an *upload* view with a single selected file, its local preview, and a progress bar.
//! It reaches the proxy only through [`FilesApi`] and creates previews only through
//! [`PreviewStore`], so both can be swapped out.
//!
//! Resource rules:
//! - a local preview is released exactly once, whether it is superseded by a new selection,
//!   replaced by the remote URL after a successful upload, or the controller is dropped
//! - the progress ticker lives only as long as the upload request that started it
//!
//! Minting is a placeholder: [`PageController::mint_placeholder`] waits and reports success
//! without contacting any chain.

use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, instrument};

use crate::api::models::files::{PinnedFile, UploadResponse};

pub mod client;
pub mod notifications;
pub mod preview;
pub mod progress;

pub use client::{FilesApi, HttpFilesApi};
pub use notifications::{Notification, NotificationKind, Notifications};
pub use preview::{MemoryPreviewStore, PreviewHandle, PreviewKind, PreviewStore, format_file_size, short_cid};
pub use progress::{PendingFlag, Progress, ProgressTicker};

/// Simulated mint latency
pub const MINT_DELAY: Duration = Duration::from_secs(2);

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully to IPFS via Pinata!";
pub const UPLOAD_FAILURE_MESSAGE: &str = "Failed to upload file";
pub const MINT_SUCCESS_MESSAGE: &str = "NFT minted successfully!";
pub const CID_COPIED_MESSAGE: &str = "CID copied to clipboard";

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("No completed upload to mint")]
    NothingToMint,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Explore,
    Upload,
}

/// A file picked by the user, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    /// Declared MIME type, possibly empty
    pub mime_type: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

struct Selection<S: PreviewStore> {
    file: LocalFile,
    kind: PreviewKind,
    /// Present until the upload succeeds
    preview: Option<PreviewHandle<S>>,
}

pub struct PageController<A: FilesApi, S: PreviewStore> {
    api: A,
    previews: Arc<S>,
    require_wallet: bool,

    tab: Tab,
    files: Vec<PinnedFile>,
    loading: PendingFlag,

    selection: Option<Selection<S>>,
    /// Local preview URL, then the remote access URL once uploaded
    file_url: Option<String>,
    uploading: PendingFlag,
    progress: Progress,
    uploaded: Option<UploadResponse>,

    wallet_connected: bool,
    minting: PendingFlag,
    /// CID of the last simulated mint; survives the reset that follows it
    minted: Option<String>,

    notifications: Notifications,
}

impl<A: FilesApi, S: PreviewStore> PageController<A, S> {
    /// Uploads require a connected wallet unless [`PageController::without_wallet_gate`] is used.
    pub fn new(api: A, previews: Arc<S>) -> Self {
        Self {
            api,
            previews,
            require_wallet: true,
            tab: Tab::default(),
            files: Vec::new(),
            loading: PendingFlag::default(),
            selection: None,
            file_url: None,
            uploading: PendingFlag::default(),
            progress: Progress::default(),
            uploaded: None,
            wallet_connected: false,
            minting: PendingFlag::default(),
            minted: None,
            notifications: Notifications::default(),
        }
    }

    /// Allow uploads without a connected wallet.
    pub fn without_wallet_gate(mut self) -> Self {
        self.require_wallet = false;
        self
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn files(&self) -> &[PinnedFile] {
        &self.files
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Shared handle; reads stay live while a list request is in flight.
    pub fn loading(&self) -> PendingFlag {
        self.loading.clone()
    }

    pub fn selected_file(&self) -> Option<&LocalFile> {
        self.selection.as_ref().map(|s| &s.file)
    }

    pub fn preview_kind(&self) -> Option<PreviewKind> {
        self.selection.as_ref().map(|s| s.kind)
    }

    pub fn file_url(&self) -> Option<&str> {
        self.file_url.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.get()
    }

    pub fn uploading(&self) -> PendingFlag {
        self.uploading.clone()
    }

    /// Shared handle; reads stay live while an upload is in flight.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    pub fn uploaded(&self) -> Option<&UploadResponse> {
        self.uploaded.as_ref()
    }

    pub fn wallet_connected(&self) -> bool {
        self.wallet_connected
    }

    pub fn set_wallet_connected(&mut self, connected: bool) {
        self.wallet_connected = connected;
    }

    pub fn is_minting(&self) -> bool {
        self.minting.get()
    }

    pub fn minting(&self) -> PendingFlag {
        self.minting.clone()
    }

    pub fn minted(&self) -> Option<&str> {
        self.minted.as_deref()
    }

    /// Notifications still on screen.
    pub fn notifications(&mut self) -> &[Notification] {
        self.notifications.current()
    }

    /// Fetch the pinned file list. On failure the previous list is kept.
    #[instrument(skip_all)]
    pub async fn load(&mut self) {
        let result = {
            let _loading = self.loading.raise();
            self.api.list_files().await
        };
        match result {
            Ok(files) => {
                info!("Loaded {} pinned files", files.len());
                self.files = files;
            }
            Err(e) => error!("Error fetching files: {}", e),
        }
    }

    /// Select the single file to upload, replacing (and releasing) any previous selection.
    pub fn select_file(&mut self, file: LocalFile) {
        let preview = PreviewHandle::create(&self.previews, &file);
        let kind = PreviewKind::from_mime(&file.mime_type);

        self.file_url = Some(preview.url().to_string());
        self.progress.set(0);
        self.uploaded = None;
        self.minted = None;
        // Dropping the old selection revokes its preview
        self.selection = Some(Selection {
            file,
            kind,
            preview: Some(preview),
        });
    }

    /// Upload the selected file.
    ///
    /// On success the local preview is released in favour of the remote URL, the list is
    /// refreshed, and the page returns to the explore tab. On failure everything but the
    /// notification is left as it was.
    #[instrument(skip_all)]
    pub async fn upload(&mut self) -> Result<UploadResponse, PageError> {
        let Some(selection) = self.selection.as_ref() else {
            return Err(PageError::NoFileSelected);
        };
        if self.require_wallet && !self.wallet_connected {
            return Err(PageError::WalletNotConnected);
        }

        self.progress.set(0);
        let result = {
            let _uploading = self.uploading.raise();
            let _ticker = ProgressTicker::start(self.progress.clone());
            self.api.upload_file(&selection.file).await
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!("Error uploading file: {}", e);
                self.notifications.push(NotificationKind::Error, UPLOAD_FAILURE_MESSAGE);
                return Err(e);
            }
        };

        self.progress.set(100);
        self.file_url = Some(response.url.clone());
        if let Some(selection) = self.selection.as_mut() {
            selection.preview = None;
        }
        self.uploaded = Some(response.clone());
        self.notifications.push(NotificationKind::Success, UPLOAD_SUCCESS_MESSAGE);

        self.load().await;
        self.tab = Tab::Explore;

        Ok(response)
    }

    /// Return the CID to put on the clipboard and confirm it briefly.
    pub fn copy_cid(&mut self, file: &PinnedFile) -> String {
        self.notifications.push_for(
            NotificationKind::Info,
            CID_COPIED_MESSAGE,
            notifications::BRIEF_DISPLAY_DURATION,
        );
        file.ipfs_hash.clone()
    }

    /// Simulated mint of the last upload. No chain is contacted.
    ///
    /// Returns the minted content hash, then clears all upload state and returns to explore.
    #[instrument(skip_all)]
    pub async fn mint_placeholder(&mut self) -> Result<String, PageError> {
        let Some(uploaded) = self.uploaded.as_ref() else {
            return Err(PageError::NothingToMint);
        };
        let cid = uploaded.ipfs_hash.clone();

        {
            let _minting = self.minting.raise();
            tokio::time::sleep(MINT_DELAY).await;
        }

        info!(cid = %cid, "Mint simulated");
        self.minted = Some(cid.clone());
        self.notifications.push(NotificationKind::Success, MINT_SUCCESS_MESSAGE);
        self.reset_upload();
        self.tab = Tab::Explore;

        Ok(cid)
    }

    fn reset_upload(&mut self) {
        self.selection = None;
        self.file_url = None;
        self.uploaded = None;
        self.progress.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn pinned(cid: &str) -> PinnedFile {
        PinnedFile {
            id: format!("id-{cid}"),
            name: format!("{cid}.png"),
            ipfs_hash: cid.to_string(),
            size: 10,
            date_pinned: Utc::now(),
            url: format!("https://gw.example/ipfs/{cid}"),
        }
    }

    #[derive(Default)]
    struct FakeApi {
        list: Mutex<Vec<Result<Vec<PinnedFile>, u16>>>,
        upload: Mutex<Option<Result<&'static str, u16>>>,
        /// When set, uploads wait for this before answering
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        /// When set, the next list call waits for this before answering
        list_gate: Mutex<Option<oneshot::Receiver<()>>>,
        list_calls: AtomicUsize,
        upload_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_lists(lists: Vec<Result<Vec<PinnedFile>, u16>>) -> Self {
            Self {
                list: Mutex::new(lists),
                ..Default::default()
            }
        }

        fn upload_result(self, result: Result<&'static str, u16>) -> Self {
            *self.upload.lock().unwrap() = Some(result);
            self
        }
    }

    fn status_error(status: u16) -> PageError {
        PageError::Status {
            status,
            message: "boom".to_string(),
        }
    }

    #[async_trait]
    impl FilesApi for FakeApi {
        async fn list_files(&self) -> Result<Vec<PinnedFile>, PageError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.list_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut lists = self.list.lock().unwrap();
            if lists.is_empty() {
                return Ok(Vec::new());
            }
            lists.remove(0).map_err(status_error)
        }

        async fn upload_file(&self, _file: &LocalFile) -> Result<UploadResponse, PageError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match self.upload.lock().unwrap().clone().unwrap_or(Err(500)) {
                Ok(cid) => Ok(UploadResponse {
                    ipfs_hash: cid.to_string(),
                    url: format!("https://gw.example/ipfs/{cid}"),
                }),
                Err(status) => Err(status_error(status)),
            }
        }
    }

    fn controller(api: FakeApi) -> (PageController<FakeApi, MemoryPreviewStore>, Arc<MemoryPreviewStore>) {
        let store = Arc::new(MemoryPreviewStore::new());
        let mut page = PageController::new(api, Arc::clone(&store));
        page.set_wallet_connected(true);
        (page, store)
    }

    fn image() -> LocalFile {
        LocalFile::new("cat.png", "image/png", &b"png bytes"[..])
    }

    #[tokio::test]
    async fn test_load_populates_list() {
        let (mut page, _) = controller(FakeApi::with_lists(vec![Ok(vec![pinned("QmA"), pinned("QmB")])]));

        page.load().await;

        assert_eq!(page.files().len(), 2);
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_loading_is_visible_while_list_is_pending() {
        let (release, gate) = oneshot::channel();
        let api = FakeApi::with_lists(vec![Ok(vec![pinned("QmA")])]);
        *api.list_gate.lock().unwrap() = Some(gate);
        let (mut page, _) = controller(api);
        let loading = page.loading();

        let observer = async {
            tokio::task::yield_now().await;
            let during = loading.get();
            let _ = release.send(());
            during
        };

        let ((), during) = tokio::join!(page.load(), observer);

        assert!(during);
        assert!(!page.is_loading());
        assert_eq!(page.files().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_list() {
        let (mut page, _) = controller(FakeApi::with_lists(vec![Ok(vec![pinned("QmA")]), Err(500)]));

        page.load().await;
        page.load().await;

        assert_eq!(page.files().len(), 1);
        assert_eq!(page.files()[0].ipfs_hash, "QmA");
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_select_file_sets_preview() {
        let (mut page, store) = controller(FakeApi::default());

        page.select_file(image());

        assert_eq!(page.preview_kind(), Some(PreviewKind::Image));
        let url = page.file_url().unwrap().to_string();
        assert!(store.is_live(&url));
    }

    #[tokio::test]
    async fn test_new_selection_releases_previous_preview_once() {
        let (mut page, store) = controller(FakeApi::default());

        page.select_file(image());
        let first = page.file_url().unwrap().to_string();
        page.select_file(LocalFile::new("song.mp3", "audio/mpeg", &b"ID3"[..]));

        assert!(!store.is_live(&first));
        assert_eq!(store.revocations(), 1);
        assert_eq!(store.live_count(), 1);
        assert_eq!(page.preview_kind(), Some(PreviewKind::Audio));
    }

    #[tokio::test]
    async fn test_upload_requires_selected_file() {
        let api = FakeApi::default().upload_result(Ok("Qm1"));
        let (mut page, _) = controller(api);

        let err = page.upload().await.unwrap_err();
        assert!(matches!(err, PageError::NoFileSelected));
        assert_eq!(page.api.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_requires_wallet() {
        let api = FakeApi::default().upload_result(Ok("Qm1"));
        let (mut page, _) = controller(api);
        page.set_wallet_connected(false);
        page.select_file(image());

        let err = page.upload().await.unwrap_err();
        assert!(matches!(err, PageError::WalletNotConnected));
        assert_eq!(page.api.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_without_wallet_gate() {
        let api = FakeApi::default().upload_result(Ok("QmOpen"));
        let store = Arc::new(MemoryPreviewStore::new());
        let mut page = PageController::new(api, store).without_wallet_gate();
        page.select_file(image());

        let response = page.upload().await.unwrap();
        assert_eq!(response.ipfs_hash, "QmOpen");
    }

    #[tokio::test]
    async fn test_upload_success_swaps_preview_for_remote_url() {
        let api = FakeApi::with_lists(vec![Ok(vec![pinned("QmNew")])]).upload_result(Ok("QmNew"));
        let (mut page, store) = controller(api);
        page.select_tab(Tab::Upload);
        page.select_file(image());
        let local = page.file_url().unwrap().to_string();

        let response = page.upload().await.unwrap();

        assert_eq!(response.ipfs_hash, "QmNew");
        assert_eq!(page.file_url(), Some("https://gw.example/ipfs/QmNew"));
        assert!(!store.is_live(&local));
        assert_eq!(store.revocations(), 1);
        assert_eq!(page.progress().get(), 100);
        assert!(!page.is_uploading());
        assert_eq!(page.tab(), Tab::Explore);
        assert_eq!(page.files().len(), 1);
        assert_eq!(page.api.list_calls.load(Ordering::SeqCst), 1);
        let notes = page.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Success);
        assert_eq!(notes[0].message, UPLOAD_SUCCESS_MESSAGE);

        // Tearing down later does not revoke a second time
        drop(page);
        assert_eq!(store.revocations(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_state_intact() {
        let api = FakeApi::default().upload_result(Err(500));
        let (mut page, store) = controller(api);
        page.select_tab(Tab::Upload);
        page.select_file(image());
        let local = page.file_url().unwrap().to_string();

        let err = page.upload().await.unwrap_err();

        assert!(matches!(err, PageError::Status { status: 500, .. }));
        assert_eq!(page.file_url(), Some(local.as_str()));
        assert!(store.is_live(&local));
        assert_eq!(page.tab(), Tab::Upload);
        assert!(page.uploaded().is_none());
        assert!(!page.is_uploading());
        assert_eq!(page.api.list_calls.load(Ordering::SeqCst), 0);
        let notes = page.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_ticks_while_pending_then_completes() {
        let (release, gate) = oneshot::channel();
        let api = FakeApi::default().upload_result(Ok("QmSlow"));
        *api.gate.lock().unwrap() = Some(gate);
        let (mut page, _) = controller(api);
        page.select_file(image());
        let progress = page.progress();
        let uploading = page.uploading();

        let observer = async {
            tokio::time::sleep(Duration::from_millis(650)).await;
            assert!(uploading.get());
            let early = progress.get();
            tokio::time::sleep(Duration::from_secs(30)).await;
            let capped = progress.get();
            let _ = release.send(());
            (early, capped)
        };

        let (result, (early, capped)) = tokio::join!(page.upload(), observer);

        assert!(result.is_ok());
        assert_eq!(early, 10);
        assert_eq!(capped, 95);
        assert_eq!(page.progress().get(), 100);

        // The ticker is gone; nothing moves the value afterwards
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(page.progress().get(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_expire() {
        let api = FakeApi::default().upload_result(Err(502));
        let (mut page, _) = controller(api);
        page.select_file(image());
        let _ = page.upload().await;
        assert_eq!(page.notifications().len(), 1);

        tokio::time::advance(Duration::from_millis(3500)).await;
        assert!(page.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_drop_mid_preview_releases_once() {
        let (mut page, store) = controller(FakeApi::default());
        page.select_file(image());
        assert_eq!(store.live_count(), 1);

        drop(page);

        assert_eq!(store.live_count(), 0);
        assert_eq!(store.revocations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_placeholder_resets_upload_state() {
        let api = FakeApi::default().upload_result(Ok("QmMint"));
        let (mut page, _) = controller(api);
        page.select_file(image());
        page.upload().await.unwrap();
        page.select_tab(Tab::Upload);

        let started = tokio::time::Instant::now();
        let minting = page.minting();
        let observer = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            minting.get()
        };
        let (cid, during) = tokio::join!(page.mint_placeholder(), observer);
        let cid = cid.unwrap();

        assert!(during);

        assert_eq!(cid, "QmMint");
        assert_eq!(page.minted(), Some("QmMint"));
        assert!(started.elapsed() >= MINT_DELAY);
        assert!(!page.is_minting());
        assert!(page.selected_file().is_none());
        assert!(page.file_url().is_none());
        assert!(page.uploaded().is_none());
        assert_eq!(page.progress().get(), 0);
        assert_eq!(page.tab(), Tab::Explore);
        assert!(page.notifications().iter().any(|n| n.message == MINT_SUCCESS_MESSAGE));

        page.select_file(image());
        assert!(page.minted().is_none());
    }

    #[tokio::test]
    async fn test_mint_requires_completed_upload() {
        let (mut page, _) = controller(FakeApi::default());
        page.select_file(image());

        let err = page.mint_placeholder().await.unwrap_err();
        assert!(matches!(err, PageError::NothingToMint));
    }

    #[tokio::test]
    async fn test_copy_cid() {
        let (mut page, _) = controller(FakeApi::default());

        let copied = page.copy_cid(&pinned("QmCopy"));

        assert_eq!(copied, "QmCopy");
        assert_eq!(page.notifications()[0].message, CID_COPIED_MESSAGE);
    }
}
