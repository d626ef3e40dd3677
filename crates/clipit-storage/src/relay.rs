//! Upload relay: copies a job's video and metadata into both run folders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use clipit_models::{blob_key, content_type_for, RunFolder};

use crate::error::{StorageError, StorageResult};
use crate::metrics;
use crate::store::ObjectStore;

/// Outputs of one job, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct UploadPair {
    pub user_email: String,
    pub video_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Object filename for the video
    pub video_name: String,
    /// Object filename for the metadata
    pub metadata_name: String,
}

impl UploadPair {
    /// Pair named after the local files.
    pub fn from_paths(
        user_email: impl Into<String>,
        video_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
    ) -> Self {
        let video_path = video_path.into();
        let metadata_path = metadata_path.into();
        Self {
            user_email: user_email.into(),
            video_name: file_name(&video_path),
            metadata_name: file_name(&metadata_path),
            video_path,
            metadata_path,
        }
    }

    /// Upload plan in execution order: previous-runs video and metadata,
    /// then current-run video and metadata.
    fn plan(&self) -> [(&Path, String, RunFolder); 4] {
        let email = self.user_email.as_str();
        [
            (
                self.video_path.as_path(),
                blob_key(email, RunFolder::PreviousRuns, &self.video_name),
                RunFolder::PreviousRuns,
            ),
            (
                self.metadata_path.as_path(),
                blob_key(email, RunFolder::PreviousRuns, &self.metadata_name),
                RunFolder::PreviousRuns,
            ),
            (
                self.video_path.as_path(),
                blob_key(email, RunFolder::CurrentRun, &self.video_name),
                RunFolder::CurrentRun,
            ),
            (
                self.metadata_path.as_path(),
                blob_key(email, RunFolder::CurrentRun, &self.metadata_name),
                RunFolder::CurrentRun,
            ),
        ]
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write side of the object store.
#[derive(Clone)]
pub struct UploadRelay {
    store: Arc<dyn ObjectStore>,
}

impl UploadRelay {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload all four objects, returning whether every upload succeeded.
    ///
    /// Uploads that completed before a failure are left in place.
    pub async fn upload_pair(&self, pair: &UploadPair) -> bool {
        match self.try_upload_pair(pair).await {
            Ok(()) => true,
            Err(e) => {
                error!(user_email = pair.user_email.as_str(), error = %e, "Upload of job outputs failed");
                false
            }
        }
    }

    /// Same as [`upload_pair`](Self::upload_pair) but reports the failure.
    pub async fn try_upload_pair(&self, pair: &UploadPair) -> StorageResult<()> {
        if pair.user_email.is_empty() {
            return Err(StorageError::InvalidKey("user email is empty".to_string()));
        }
        if pair.video_name.is_empty() || pair.metadata_name.is_empty() {
            return Err(StorageError::InvalidKey("object filename is empty".to_string()));
        }
        for path in [&pair.video_path, &pair.metadata_path] {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                warn!(path = %path.display(), "Local file missing, nothing uploaded");
                return Err(StorageError::MissingFile(path.display().to_string()));
            }
        }

        for (path, key, folder) in pair.plan() {
            let result = self
                .store
                .upload_file(path, &key, content_type_for(&key))
                .await;
            metrics::record_upload(folder.as_str(), result.is_ok());
            result?;
        }

        info!(
            user_email = pair.user_email.as_str(),
            video = pair.video_name.as_str(),
            metadata = pair.metadata_name.as_str(),
            "Uploaded job outputs to current and previous runs"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;
    use tempfile::TempDir;

    fn write_outputs(dir: &TempDir) -> (PathBuf, PathBuf) {
        let video = dir.path().join("clip.mp4");
        let metadata = dir.path().join("clip.json");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(&metadata, b"{\"score\":1}").unwrap();
        (video, metadata)
    }

    #[tokio::test]
    async fn test_upload_pair_writes_four_objects_in_order() {
        let dir = TempDir::new().unwrap();
        let (video, metadata) = write_outputs(&dir);
        let store = Arc::new(MemoryObjectStore::new());
        let relay = UploadRelay::new(store.clone());

        let pair = UploadPair::from_paths("a@x.com", video, metadata);
        assert!(relay.upload_pair(&pair).await);

        assert_eq!(
            store.upload_log(),
            vec![
                "a@x.com/PreviousRuns/clip.mp4",
                "a@x.com/PreviousRuns/clip.json",
                "a@x.com/CurrentRun/clip.mp4",
                "a@x.com/CurrentRun/clip.json",
            ]
        );
        assert_eq!(store.get("a@x.com/CurrentRun/clip.mp4").unwrap(), b"video");
        assert_eq!(
            store.content_type("a@x.com/CurrentRun/clip.json").as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_missing_file_uploads_nothing() {
        let dir = TempDir::new().unwrap();
        let (video, _) = write_outputs(&dir);
        let store = Arc::new(MemoryObjectStore::new());
        let relay = UploadRelay::new(store.clone());

        let pair = UploadPair::from_paths("a@x.com", video, dir.path().join("absent.json"));
        assert!(!relay.upload_pair(&pair).await);
        assert!(store.upload_log().is_empty());
    }

    #[tokio::test]
    async fn test_empty_email_uploads_nothing() {
        let dir = TempDir::new().unwrap();
        let (video, metadata) = write_outputs(&dir);
        let store = Arc::new(MemoryObjectStore::new());
        let relay = UploadRelay::new(store.clone());

        let pair = UploadPair::from_paths("", video, metadata);
        let err = relay.try_upload_pair(&pair).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(store.upload_log().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_rolled_back() {
        let dir = TempDir::new().unwrap();
        let (video, metadata) = write_outputs(&dir);
        let store = Arc::new(MemoryObjectStore::new());
        store.fail_upload_for("a@x.com/CurrentRun/clip.mp4");
        let relay = UploadRelay::new(store.clone());

        let pair = UploadPair::from_paths("a@x.com", video, metadata);
        assert!(!relay.upload_pair(&pair).await);

        assert!(store.contains("a@x.com/PreviousRuns/clip.mp4"));
        assert!(store.contains("a@x.com/PreviousRuns/clip.json"));
        assert!(!store.contains("a@x.com/CurrentRun/clip.mp4"));
        assert!(!store.contains("a@x.com/CurrentRun/clip.json"));
        assert_eq!(store.upload_log().len(), 3);
    }
}
