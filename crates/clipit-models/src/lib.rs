//! Shared data models for the Clipit backend.
//!
//! This crate provides Serde-serializable types for:
//! - User records (payment plan, upload-completion flag)
//! - Clip jobs submitted for background processing
//! - Blob keys for the current-run / previous-runs layout

pub mod blob;
pub mod job;
pub mod user;

pub use blob::{blob_key, content_type_for, is_video_key, run_prefix, RunFolder};
pub use job::{ClipJobRequest, JobId};
pub use user::{fields as user_fields, UploadStatus, UserRecord, DEFAULT_PAYMENT_PLAN};

use std::time::Duration;

/// Bucket holding every user's clips.
pub const BUCKET_NAME: &str = "clipitshorts";

/// Lifetime of a signed download URL, in minutes.
pub const SIGNED_URL_TTL_MINUTES: u64 = 1500;

/// Prefix listed when a user's `CurrentRun` directory is empty.
///
/// Clients with an unset identity upload under the literal string
/// `"undefined"`; listings keep reading from there until that is fixed
/// upstream.
pub const UNDEFINED_FALLBACK_PREFIX: &str = "undefined/";

/// Lifetime of a signed download URL.
pub fn signed_url_ttl() -> Duration {
    Duration::from_secs(SIGNED_URL_TTL_MINUTES * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_url_ttl() {
        assert_eq!(signed_url_ttl(), Duration::from_secs(90_000));
    }
}
