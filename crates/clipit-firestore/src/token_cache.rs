//! Bearer tokens for Firestore requests.
//!
//! `TokenCache` keeps one service-account token and refreshes it shortly
//! before expiry. Concurrent callers share a single refresh, and a failed
//! refresh falls back to the old token while it has not expired.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const REFRESH_BEFORE_EXPIRY: Duration = Duration::from_secs(60);

pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Source of bearer tokens for Firestore requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current access token.
    async fn access_token(&self) -> FirestoreResult<String>;

    /// Drop any cached token after the server rejected it.
    async fn invalidate(&self) {}
}

/// Fixed bearer token, for the Firestore emulator and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> FirestoreResult<String> {
        Ok(self.0.clone())
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn from_provider(token: &gcp_auth::Token) -> Self {
        // Already-expired tokens get a zero lifetime.
        let remaining = (token.expires_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        Self {
            value: token.as_str().to_string(),
            expires_at: Instant::now() + remaining,
        }
    }

    fn fresh(&self) -> bool {
        Instant::now() + REFRESH_BEFORE_EXPIRY < self.expires_at
    }

    fn unexpired(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Service-account token cache with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(token) = self.cache.read().await.as_ref().filter(|t| t.fresh()) {
            return Ok(token.value.clone());
        }

        let mut slot = self.cache.write().await;
        // Refreshed by another task while this one waited for the lock.
        if let Some(token) = slot.as_ref().filter(|t| t.fresh()) {
            return Ok(token.value.clone());
        }

        match self.auth.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let cached = CachedToken::from_provider(&token);
                let value = cached.value.clone();
                *slot = Some(cached);
                debug!("Firestore access token refreshed");
                Ok(value)
            }
            Err(e) => match slot.as_ref().filter(|t| t.unexpired()) {
                Some(stale) => {
                    warn!(error = %e, "Token refresh failed, reusing unexpired token");
                    Ok(stale.value.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain access token: {}",
                    e
                ))),
            },
        }
    }
}

#[async_trait]
impl TokenSource for TokenCache {
    async fn access_token(&self) -> FirestoreResult<String> {
        self.get_token().await
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_freshness() {
        let token = CachedToken {
            value: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!token.fresh());
        assert!(token.unexpired());

        let token = CachedToken {
            value: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };
        assert!(token.fresh());
    }

    #[test]
    fn test_firestore_scope() {
        assert!(FIRESTORE_SCOPE.contains("datastore"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken("owner".to_string());
        assert_eq!(source.access_token().await.unwrap(), "owner");
        source.invalidate().await;
        assert_eq!(source.access_token().await.unwrap(), "owner");
    }
}
