//! Firestore REST API client.
//!
//! - Token caching with refresh margin
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::CustomServiceAccount;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::{TokenCache, TokenSource};
use crate::types::{Document, Value};

/// Public Firestore REST root.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Document read by readiness checks. Ids matching `__.*__` are reserved.
pub const CONNECTIVITY_CHECK_DOC_ID: &str = "_connectivity_check";

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// REST root, e.g. `https://firestore.googleapis.com/v1` or an emulator
    pub base_url: String,
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    ///
    /// `GCP_PROJECT_ID` wins over `fallback_project_id` (normally the
    /// service account's own project).
    pub fn from_env(fallback_project_id: Option<&str>) -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| fallback_project_id.map(str::to_string))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                FirestoreError::config_error(
                    "GCP_PROJECT_ID not set and the service account has no project_id",
                )
            })?;

        let base_url = std::env::var("DB_URI")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    documents_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreClient {
    /// Create a client with an explicit token source.
    pub fn new(config: FirestoreConfig, tokens: Arc<dyn TokenSource>) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipit-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            config.base_url, config.project_id, config.database_id
        );

        Ok(Self {
            http,
            config,
            documents_url,
            tokens,
        })
    }

    /// Create a client authenticated with a service-account key file.
    pub fn from_key_file(path: impl AsRef<Path>) -> FirestoreResult<Self> {
        let path = path.as_ref();
        let service_account = CustomServiceAccount::from_file(path).map_err(|e| {
            FirestoreError::auth_error(format!(
                "Failed to load service account {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = FirestoreConfig::from_env(service_account.project_id())?;
        Self::new(config, Arc::new(TokenCache::new(Arc::new(service_account))))
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request with a bearer token, refreshing it once on expiry.
    async fn send_authorized<F>(&self, url: &str, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.access_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                401,
                format!("{} failed: {}", url, body),
            ));
        }

        self.tokens.invalidate().await;
        let token = self.tokens.access_token().await?;
        Ok(build(&token).send().await?)
    }

    /// Get a document; `None` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = &self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), || async move {
            let response = self
                .send_authorized(url, |token| self.http.get(url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Write the masked fields of a document, creating it if absent.
    ///
    /// Fields outside `update_mask` are left untouched. The write is a single
    /// atomic PATCH without preconditions.
    pub async fn upsert_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[&str],
    ) -> FirestoreResult<Document> {
        let mut url = self.document_url(collection, doc_id);
        if !update_mask.is_empty() {
            let params: Vec<String> = update_mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
                .collect();
            url = format!("{}?{}", url, params.join("&"));
        }

        let url = &url;
        let body = &Document::new(fields);

        self.execute_request("upsert_document", collection, Some(doc_id), || async move {
            let response = self
                .send_authorized(url, |token| {
                    self.http.patch(url).bearer_auth(token).json(body)
                })
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                status => Err(Self::handle_error_response(status, url, response).await),
            }
        })
        .await
    }

    /// Cheap authenticated read used by readiness checks.
    ///
    /// A missing document still proves that auth and the database work.
    pub async fn check_connectivity(&self, collection: &str) -> FirestoreResult<()> {
        self.get_document(collection, CONNECTIVITY_CHECK_DOC_ID)
            .await
            .map(|_| ())
    }

    /// Run an operation under the retry policy, with a tracing span and
    /// request metrics per attempt.
    async fn execute_request<T, F, Fut>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        op: F,
    ) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        let op = &op;
        with_retry(&self.config.retry, operation, || async move {
            let span = match doc_id {
                Some(id) => info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id),
                None => info_span!("firestore_request", operation = %operation, collection = %collection),
            };

            let start = Instant::now();
            let result = op().instrument(span).await;

            let status = match &result {
                Ok(_) => 200,
                Err(e) => e.http_status().unwrap_or(500),
            };
            record_request(operation, collection, status, start.elapsed());

            result
        })
        .await
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
