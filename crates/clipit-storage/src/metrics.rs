//! Object store metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Signed URLs by outcome (issued, missing, error).
    pub const SIGNED_URLS_TOTAL: &str = "clipit_signed_urls_total";

    /// Single-object uploads by run folder and outcome.
    pub const UPLOADS_TOTAL: &str = "clipit_uploads_total";
}

/// Record the outcome of one signed URL request.
pub fn record_signed_url(outcome: &'static str) {
    counter!(names::SIGNED_URLS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record one object upload.
pub fn record_upload(folder: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(names::UPLOADS_TOTAL, "folder" => folder, "status" => status).increment(1);
}
