//! Object store abstraction.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Minimal blob-store surface used by the gateway and the upload relay.
///
/// Keys are full object paths inside the store's single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store is bound to.
    fn bucket(&self) -> &str;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List keys starting with `prefix`, in store order.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Produce a GET-only signed URL valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Upload a local file to `key`.
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    /// Cheap round-trip used by readiness checks.
    async fn check_connectivity(&self) -> StorageResult<()>;
}
