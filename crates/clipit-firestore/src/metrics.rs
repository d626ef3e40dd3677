//! Document store metrics.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    /// Requests by operation, collection and HTTP status.
    pub const REQUESTS_TOTAL: &str = "clipit_firestore_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "clipit_firestore_request_duration_seconds";
    pub const RETRIES_TOTAL: &str = "clipit_firestore_retries_total";
    /// User record upserts by outcome (`created`, `updated`, `error`).
    pub const USER_WRITES_TOTAL: &str = "clipit_firestore_user_writes_total";
}

/// One request attempt, including attempts that are retried.
pub fn record_request(operation: &str, collection: &str, status: u16, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "collection" => collection.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "operation" => operation.to_string(),
        "collection" => collection.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_user_write(outcome: &'static str) {
    counter!(names::USER_WRITES_TOTAL, "outcome" => outcome).increment(1);
}
