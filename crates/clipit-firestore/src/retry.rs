//! Retry of idempotent Firestore requests.
//!
//! Network failures, 429 and 5xx are retried with capped exponential backoff
//! and jitter. A server-provided rate-limit hint replaces the backoff.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info_span, warn, Instrument};

use crate::error::FirestoreResult;
use crate::metrics::record_retry;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Smallest delay between attempts.
    pub base_delay_ms: u64,
    /// Upper bound on any delay, including rate-limit hints.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Delays from `FIRESTORE_RETRY_BASE_MS` and `FIRESTORE_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok());
        let defaults = Self::default();
        Self {
            base_delay_ms: read("FIRESTORE_RETRY_BASE_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: read("FIRESTORE_RETRY_MAX_MS").unwrap_or(defaults.max_delay_ms),
            ..defaults
        }
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32, rate_limit_hint_ms: Option<u64>) -> Duration {
        let ms = match rate_limit_hint_ms {
            Some(hint) => hint.min(self.max_delay_ms),
            None => {
                let ceiling = self
                    .base_delay_ms
                    .saturating_mul(1u64 << attempt.min(32))
                    .min(self.max_delay_ms);
                ((ceiling as f64 * jitter_fraction()) as u64).max(self.base_delay_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

/// Clock-derived value in `[0, 1)`.
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> FirestoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("firestore_attempt", operation = %operation, attempt = attempt + 1);
        let err = match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= config.max_retries {
            return Err(err);
        }

        let delay = config.backoff(attempt, err.retry_after_ms());
        warn!(
            operation = %operation,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying Firestore request"
        );
        record_retry(operation);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::FirestoreError;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_rate_limit_hint_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0, Some(2000)), Duration::from_millis(2000));
        assert_eq!(config.backoff(0, Some(60_000)), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_stays_within_bounds() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 2000,
        };
        let delay = config.backoff(10, None);
        assert!(delay.as_millis() >= 1000 && delay.as_millis() <= 2000);
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_config(), "test", || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FirestoreError::from_http_status(503, "unavailable"))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: FirestoreResult<()> = with_retry(&fast_config(), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FirestoreError::from_http_status(400, "bad request"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: FirestoreResult<()> = with_retry(&fast_config(), "test", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FirestoreError::from_http_status(500, "boom"))
        })
        .await;

        assert!(matches!(result, Err(FirestoreError::ServerError(500, _))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
