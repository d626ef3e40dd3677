//! GCS client over the S3-interoperable XML API.
//!
//! GCS accepts SigV4 requests signed with a service account's HMAC key, so
//! listing, uploads and V4 signed URLs all go through `aws-sdk-s3`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{
    Builder, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use clipit_models::BUCKET_NAME;

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Default S3-interoperable GCS endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://storage.googleapis.com";

/// Configuration for the GCS client.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// Interoperability endpoint URL
    pub endpoint_url: String,
    /// HMAC access key ID
    pub access_key_id: String,
    /// HMAC secret
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Signing region ("auto" for GCS)
    pub region: String,
}

impl GcsConfig {
    /// Create config from environment variables.
    ///
    /// The bucket is fixed; only endpoint, credentials and region are read.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("GCS_ENDPOINT_URL")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT_URL.to_string()),
            access_key_id: std::env::var("GCS_HMAC_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("GCS_HMAC_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("GCS_HMAC_SECRET")
                .map_err(|_| StorageError::config_error("GCS_HMAC_SECRET not set"))?,
            bucket_name: BUCKET_NAME.to_string(),
            region: std::env::var("GCS_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// GCS storage client.
#[derive(Clone)]
pub struct GcsClient {
    client: Client,
    bucket: String,
}

impl GcsClient {
    /// Create a new client from configuration.
    pub fn new(config: GcsConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "gcs-hmac",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            // GCS rejects aws-chunked uploads with checksum trailers.
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(GcsConfig::from_env()?))
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                    || e.raw_response()
                        .map(|r| r.status().as_u16() == 404)
                        .unwrap_or(false);
                if missing {
                    Ok(false)
                } else {
                    Err(StorageError::backend(format!("HEAD {} failed: {}", key, e)))
                }
            }
        }
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::list_failed(e.to_string()))?;

            keys.extend(response.contents().iter().filter_map(|obj| obj.key.clone()));

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::backend(format!("GCS connectivity check failed: {}", e)))?;
        Ok(())
    }
}
