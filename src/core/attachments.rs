//! Files staged for the next chat message.
//!
//! The session owns each record outright. A record's preview handle is
//! released when the record leaves the session, whichever way it leaves.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{BlobStore, Upload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// Releases whatever backs a preview URL.
pub trait PreviewRevoker: Send + Sync {
    fn revoke(&self, url: &str);
}

/// A preview URL that is revoked when dropped.
pub struct PreviewUrl {
    url: String,
    revoker: Arc<dyn PreviewRevoker>,
}

impl PreviewUrl {
    pub fn new(url: impl Into<String>, revoker: Arc<dyn PreviewRevoker>) -> Self {
        Self {
            url: url.into(),
            revoker,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.revoker.revoke(&self.url);
    }
}

impl fmt::Debug for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewUrl").field(&self.url).finish()
    }
}

/// Folder under the project prefix that attachments upload into, kept apart
/// from `input.csv`, `config.json` and `result.csv`.
pub const ATTACHMENT_DIR: &str = "attachments";

/// Blob path for an attachment: `{prefix}/attachments/{id}-{name}`. The id
/// keeps files with the same name apart; characters outside `[A-Za-z0-9._-]`
/// become `_` so it stays a single path segment.
pub fn attachment_key(prefix: &str, file: &FileInfo) -> String {
    let id: String = file
        .id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}/{ATTACHMENT_DIR}/{id}-{}", prefix.trim_end_matches('/'), file.name)
}

#[derive(Debug)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    /// MIME type.
    pub content_type: String,
    pub size: u64,
    pub status: UploadStatus,
    pub source: PathBuf,
    pub preview: Option<PreviewUrl>,
    pub url: Option<String>,
    pub key: Option<String>,
}

impl FileInfo {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<PathBuf>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        let source = source.into();
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: id.into(),
            name,
            content_type: content_type.into(),
            size,
            status: UploadStatus::Pending,
            source,
            preview: None,
            url: None,
            key: None,
        }
    }

    /// Where the file can be shown from: the uploaded URL once available,
    /// otherwise the local preview.
    pub fn display_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.preview.as_ref().map(PreviewUrl::as_str))
    }
}

#[derive(Debug, Default)]
pub struct AttachmentSession {
    files: Vec<FileInfo>,
}

impl AttachmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn get(&self, id: &str) -> Option<&FileInfo> {
        self.files.iter().find(|file| file.id == id)
    }

    /// Append `file` unless a record with the same id exists; the rejected
    /// record is dropped and its preview released.
    pub fn add(&mut self, file: FileInfo) -> bool {
        if self.get(&file.id).is_some() {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Modify the record with `id` in place. Returns whether it was found.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut FileInfo)) -> bool {
        match self.files.iter_mut().find(|file| file.id == id) {
            Some(file) => {
                f(file);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<FileInfo> {
        let index = self.files.iter().position(|file| file.id == id)?;
        Some(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Hand the staged files to the message being sent, leaving the session
    /// empty.
    pub fn drain_for_send(&mut self) -> Vec<FileInfo> {
        std::mem::take(&mut self.files)
    }

    /// Sending is blocked while anything is still waiting to upload.
    pub fn has_pending(&self) -> bool {
        self.files
            .iter()
            .any(|file| matches!(file.status, UploadStatus::Pending | UploadStatus::Uploading))
    }

    /// Upload every pending file under `prefix/attachments/`. Each record moves to
    /// `uploading`, then `success` (with `url`/`key`) or `error`. Returns the
    /// number of files that failed.
    pub async fn upload_pending(&mut self, store: &dyn BlobStore, prefix: &str) -> usize {
        let pending: Vec<String> = self
            .files
            .iter()
            .filter(|file| file.status == UploadStatus::Pending)
            .map(|file| file.id.clone())
            .collect();

        let mut failed = 0;
        for id in pending {
            let Some(index) = self.files.iter().position(|file| file.id == id) else {
                continue;
            };
            self.files[index].status = UploadStatus::Uploading;

            let file = &self.files[index];
            let pathname = attachment_key(prefix, file);
            let outcome = match tokio::fs::read(&file.source).await {
                Ok(bytes) => store
                    .upload(Upload::new(pathname, &file.content_type, bytes))
                    .await
                    .map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };

            let file = &mut self.files[index];
            match outcome {
                Ok(blob) => {
                    debug!(id = %file.id, url = %blob.url, "attachment uploaded");
                    file.status = UploadStatus::Success;
                    file.url = Some(blob.url);
                    file.key = Some(blob.pathname);
                }
                Err(err) => {
                    warn!(id = %file.id, error = %err, "attachment upload failed");
                    file.status = UploadStatus::Error;
                    failed += 1;
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, UploadedBlob};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingRevoker {
        revoked: Mutex<Vec<String>>,
    }

    impl PreviewRevoker for CountingRevoker {
        fn revoke(&self, url: &str) {
            self.revoked.lock().unwrap().push(url.to_string());
        }
    }

    fn file_with_preview(id: &str, revoker: &Arc<CountingRevoker>) -> FileInfo {
        let mut file = FileInfo::new(id, format!("/tmp/{id}.png"), "image/png", 10);
        file.preview = Some(PreviewUrl::new(format!("preview:{id}"), revoker.clone()));
        file
    }

    #[test]
    fn add_ignores_duplicate_ids() {
        let revoker = Arc::new(CountingRevoker::default());
        let mut session = AttachmentSession::new();
        assert!(session.add(file_with_preview("a", &revoker)));
        assert!(!session.add(file_with_preview("a", &revoker)));
        assert_eq!(session.files().len(), 1);
        // The rejected duplicate released its own preview only.
        assert_eq!(*revoker.revoked.lock().unwrap(), vec!["preview:a".to_string()]);
    }

    #[test]
    fn previews_are_revoked_exactly_once_on_every_exit() {
        let revoker = Arc::new(CountingRevoker::default());
        let mut session = AttachmentSession::new();
        for id in ["a", "b", "c", "d"] {
            session.add(file_with_preview(id, &revoker));
        }

        drop(session.remove("a"));
        let sent = session.drain_for_send();
        assert_eq!(sent.len(), 3);
        assert!(session.files().is_empty());
        drop(sent);
        session.clear();

        let mut revoked = revoker.revoked.lock().unwrap().clone();
        revoked.sort();
        assert_eq!(revoked, vec!["preview:a", "preview:b", "preview:c", "preview:d"]);
    }

    #[test]
    fn teardown_releases_remaining_previews() {
        let revoker = Arc::new(CountingRevoker::default());
        {
            let mut session = AttachmentSession::new();
            session.add(file_with_preview("x", &revoker));
            session.clear();
            session.add(file_with_preview("y", &revoker));
        }
        assert_eq!(revoker.revoked.lock().unwrap().len(), 2);
    }

    #[test]
    fn update_mutates_in_place() {
        let mut session = AttachmentSession::new();
        session.add(FileInfo::new("a", "/tmp/a.txt", "text/plain", 1));
        assert!(session.update("a", |file| file.status = UploadStatus::Error));
        assert!(!session.update("missing", |_| panic!("should not run")));
        assert_eq!(session.get("a").map(|file| file.status), Some(UploadStatus::Error));
        assert_eq!(session.get("a").map(|file| file.name.as_str()), Some("a.txt"));
    }

    struct FakeStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for FakeStore {
        async fn fetch_text(&self, _path: &str) -> Result<Option<String>, ApiError> {
            Ok(None)
        }

        async fn upload(&self, upload: Upload) -> Result<UploadedBlob, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(UploadedBlob {
                url: format!("https://blob.example/{}", upload.pathname),
                pathname: upload.pathname,
                download_url: None,
                content_type: Some(upload.content_type),
            })
        }
    }

    #[tokio::test]
    async fn upload_pending_moves_status_forward() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("seq.fasta");
        std::fs::write(&present, ">a\nMKV\n").unwrap();

        let mut session = AttachmentSession::new();
        session.add(FileInfo::new("ok", &present, "text/plain", 7));
        session.add(FileInfo::new("gone", dir.path().join("missing.txt"), "text/plain", 0));
        let mut done = FileInfo::new("done", &present, "text/plain", 7);
        done.status = UploadStatus::Success;
        session.add(done);
        assert!(session.has_pending());

        let store = FakeStore {
            calls: AtomicUsize::new(0),
        };
        let failed = session.upload_pending(&store, "room1/").await;

        assert_eq!(failed, 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        let ok = session.get("ok").unwrap();
        assert_eq!(ok.status, UploadStatus::Success);
        assert_eq!(ok.key.as_deref(), Some("room1/attachments/ok-seq.fasta"));
        assert_eq!(
            ok.display_url(),
            Some("https://blob.example/room1/attachments/ok-seq.fasta")
        );
        assert_eq!(session.get("gone").unwrap().status, UploadStatus::Error);
        assert!(!session.has_pending());
    }

    #[tokio::test]
    async fn same_named_files_get_distinct_keys_outside_project_files() {
        let dir = tempfile::TempDir::new().unwrap();
        for sub in ["a", "b"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("input.csv"), sub).unwrap();
        }

        let mut session = AttachmentSession::new();
        session.add(FileInfo::new("0", dir.path().join("a/input.csv"), "text/csv", 1));
        session.add(FileInfo::new("1", dir.path().join("b/input.csv"), "text/csv", 1));
        let store = FakeStore {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(session.upload_pending(&store, "p1").await, 0);

        let keys: Vec<_> = session.files().iter().filter_map(|f| f.key.clone()).collect();
        assert_eq!(keys, vec!["p1/attachments/0-input.csv", "p1/attachments/1-input.csv"]);
        assert!(keys.iter().all(|key| key != "p1/input.csv"));
    }

    #[test]
    fn key_ids_stay_one_path_segment() {
        let file = FileInfo::new("3-a/b c", "/tmp/config.json", "application/json", 2);
        assert_eq!(attachment_key("p1/", &file), "p1/attachments/3-a_b_c-config.json");
    }
}
