//! Signed URL gateway.

use std::sync::Arc;

use tracing::{debug, info, warn};

use clipit_models::{is_video_key, run_prefix, signed_url_ttl, RunFolder, UNDEFINED_FALLBACK_PREFIX};

use crate::error::StorageResult;
use crate::metrics;
use crate::store::ObjectStore;

/// Read side of the object store: existence checks and signed URLs.
#[derive(Clone)]
pub struct ClipGateway {
    store: Arc<dyn ObjectStore>,
}

impl ClipGateway {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Signed GET URL for `key`, valid for 1500 minutes.
    ///
    /// Returns `Ok(None)` when the object does not exist; store failures are
    /// returned as errors.
    pub async fn signed_url(&self, key: &str) -> StorageResult<Option<String>> {
        let exists = match self.store.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                metrics::record_signed_url("error");
                return Err(e);
            }
        };

        if !exists {
            debug!(bucket = self.store.bucket(), key, "Object does not exist, no signed URL");
            metrics::record_signed_url("missing");
            return Ok(None);
        }

        match self.store.presign_get(key, signed_url_ttl()).await {
            Ok(url) => {
                metrics::record_signed_url("issued");
                Ok(Some(url))
            }
            Err(e) => {
                metrics::record_signed_url("error");
                Err(e)
            }
        }
    }

    /// Signed URLs for every `.mp4` object under `prefix`, in listing order.
    ///
    /// Objects that cannot be signed are skipped.
    pub async fn list_signed_urls_under_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let keys = self.store.list_keys(prefix).await?;

        let mut urls = Vec::new();
        for key in keys.iter().filter(|k| is_video_key(k)) {
            match self.signed_url(key).await {
                Ok(Some(url)) => urls.push(url),
                Ok(None) => debug!(key = key.as_str(), "Object vanished during listing"),
                Err(e) => warn!(
                    key = key.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "Skipping object that could not be signed"
                ),
            }
        }

        Ok(urls)
    }

    /// Signed URLs for a user's clips.
    ///
    /// `directory` defaults to the user's `CurrentRun` folder. When a
    /// `CurrentRun` directory yields nothing, the `undefined/` prefix is
    /// listed instead.
    pub async fn list_user_clips(
        &self,
        user_email: &str,
        directory: Option<&str>,
    ) -> StorageResult<Vec<String>> {
        let directory = match directory {
            Some(dir) if !dir.is_empty() => dir.to_string(),
            _ => run_prefix(user_email, RunFolder::CurrentRun),
        };

        let urls = self.list_signed_urls_under_prefix(&directory).await?;
        if !urls.is_empty() || !directory.contains(RunFolder::CurrentRun.as_str()) {
            return Ok(urls);
        }

        info!(
            user_email,
            directory = directory.as_str(),
            fallback = UNDEFINED_FALLBACK_PREFIX,
            "No clips in current run, listing fallback prefix"
        );
        self.list_signed_urls_under_prefix(UNDEFINED_FALLBACK_PREFIX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;

    fn gateway_with(store: Arc<MemoryObjectStore>) -> ClipGateway {
        ClipGateway::new(store)
    }

    #[tokio::test]
    async fn test_signed_url_for_existing_object() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u/CurrentRun/a.mp4", b"v".to_vec());
        let gateway = gateway_with(store);

        let url = gateway.signed_url("u/CurrentRun/a.mp4").await.unwrap();
        assert_eq!(
            url.as_deref(),
            Some("memory://clipitshorts/u/CurrentRun/a.mp4?expires=90000")
        );
    }

    #[tokio::test]
    async fn test_signed_url_distinguishes_missing_from_error() {
        let store = Arc::new(MemoryObjectStore::new());
        let gateway = gateway_with(store.clone());

        assert_eq!(gateway.signed_url("u/CurrentRun/none.mp4").await.unwrap(), None);

        store.set_fail_exists(true);
        assert!(gateway.signed_url("u/CurrentRun/none.mp4").await.is_err());
    }

    #[tokio::test]
    async fn test_listing_keeps_only_mp4() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u/CurrentRun/a.mp4", b"v".to_vec());
        store.insert("u/CurrentRun/a.json", b"{}".to_vec());
        store.insert("u/CurrentRun/B.MP4", b"v".to_vec());
        store.insert("u/PreviousRuns/c.mp4", b"v".to_vec());
        let gateway = gateway_with(store);

        let urls = gateway
            .list_signed_urls_under_prefix("u/CurrentRun/")
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.contains("/u/CurrentRun/")));
    }

    #[tokio::test]
    async fn test_listing_skips_signing_failures() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("u/CurrentRun/a.mp4", b"v".to_vec());
        store.insert("u/CurrentRun/b.mp4", b"v".to_vec());
        store.fail_presign_for("u/CurrentRun/a.mp4");
        let gateway = gateway_with(store);

        let urls = gateway
            .list_signed_urls_under_prefix("u/CurrentRun/")
            .await
            .unwrap();
        assert_eq!(urls, vec!["memory://clipitshorts/u/CurrentRun/b.mp4?expires=90000"]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let store = Arc::new(MemoryObjectStore::new());
        store.set_fail_list(true);
        let gateway = gateway_with(store);

        assert!(gateway.list_signed_urls_under_prefix("u/").await.is_err());
    }

    #[tokio::test]
    async fn test_user_clips_default_directory() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("a@x.com/CurrentRun/clip.mp4", b"v".to_vec());
        store.insert("undefined/other.mp4", b"v".to_vec());
        let gateway = gateway_with(store);

        let urls = gateway.list_user_clips("a@x.com", None).await.unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("a@x.com/CurrentRun/clip.mp4"));
    }

    #[tokio::test]
    async fn test_user_clips_fall_back_to_undefined_prefix() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("undefined/other.mp4", b"v".to_vec());
        let gateway = gateway_with(store);

        let urls = gateway.list_user_clips("a@x.com", None).await.unwrap();
        assert_eq!(urls, vec!["memory://clipitshorts/undefined/other.mp4?expires=90000"]);
    }

    #[tokio::test]
    async fn test_fallback_may_be_empty() {
        let store = Arc::new(MemoryObjectStore::new());
        let gateway = gateway_with(store);

        assert!(gateway.list_user_clips("a@x.com", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_fallback_for_other_directories() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("undefined/other.mp4", b"v".to_vec());
        let gateway = gateway_with(store);

        let urls = gateway
            .list_user_clips("a@x.com", Some("a@x.com/PreviousRuns/"))
            .await
            .unwrap();
        assert!(urls.is_empty());
    }
}
