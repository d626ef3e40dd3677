//! Job metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "clipit_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "clipit_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "clipit_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "clipit_job_duration_seconds";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "completed").record(duration_secs);
}

/// `stage` is where the job stopped: "process", "upload" or "finalize".
pub fn record_job_failed(stage: &'static str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "failed").record(duration_secs);
}
