//! In-memory object store for tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use clipit_models::BUCKET_NAME;

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

#[derive(Default)]
struct State {
    objects: BTreeMap<String, (Vec<u8>, String)>,
    uploads: Vec<String>,
    fail_presign: HashSet<String>,
    fail_upload: HashSet<String>,
    fail_list: bool,
    fail_exists: bool,
}

/// Object store backed by a sorted map.
///
/// Signed URLs have the form `memory://{bucket}/{key}?expires={secs}`.
/// Individual operations can be made to fail to exercise error paths.
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state
            .objects
            .insert(key.into(), (data.into(), "application/octet-stream".to_string()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().objects.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(key).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().objects.get(key).map(|(_, ct)| ct.clone())
    }

    /// Keys passed to `upload_file`, in call order, including failed ones.
    pub fn upload_log(&self) -> Vec<String> {
        self.lock().uploads.clone()
    }

    pub fn fail_presign_for(&self, key: impl Into<String>) {
        self.lock().fail_presign.insert(key.into());
    }

    pub fn fail_upload_for(&self, key: impl Into<String>) {
        self.lock().fail_upload.insert(key.into());
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn set_fail_exists(&self, fail: bool) {
        self.lock().fail_exists = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        BUCKET_NAME
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let state = self.lock();
        if state.fail_exists {
            return Err(StorageError::backend("injected exists failure"));
        }
        Ok(state.objects.contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let state = self.lock();
        if state.fail_list {
            return Err(StorageError::list_failed("injected list failure"));
        }
        Ok(state
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        if self.lock().fail_presign.contains(key) {
            return Err(StorageError::presign_failed(format!("injected failure for {}", key)));
        }
        Ok(format!(
            "memory://{}/{}?expires={}",
            BUCKET_NAME,
            key,
            expires_in.as_secs()
        ))
    }

    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        self.lock().uploads.push(key.to_string());
        if self.lock().fail_upload.contains(key) {
            return Err(StorageError::upload_failed(format!("injected failure for {}", key)));
        }
        let data = tokio::fs::read(path).await?;
        self.lock()
            .objects
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}
