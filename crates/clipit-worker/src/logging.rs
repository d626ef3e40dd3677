//! Structured job logging.

use std::fmt::Display;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Span};

use clipit_models::JobId;

const OPERATION: &str = "clip_processing";

/// Lifecycle log lines for one job; every line carries the job id, the
/// user and the operation.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    user_email: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, user_email: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            user_email: user_email.to_string(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn started(&self, link: &str) {
        info!(
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION,
            link,
            "Clip job started"
        );
    }

    pub fn stage_done(&self, stage: &str) {
        info!(
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION,
            stage,
            "Clip job stage finished"
        );
    }

    pub fn completed(&self, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION,
            duration_ms = elapsed.as_millis() as u64,
            "Clip job completed"
        );
    }

    pub fn failed(&self, stage: &str, err: &dyn Display) {
        error!(
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION,
            stage,
            error = %err,
            "Clip job failed"
        );
    }

    /// Failure that does not change the job's outcome.
    pub fn side_effect_failed(&self, what: &str, err: &dyn Display) {
        warn!(
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION,
            error = %err,
            "Could not {}", what
        );
    }

    /// Span wrapping the whole background unit.
    pub fn span(&self) -> Span {
        info_span!(
            "clip_job",
            job_id = %self.job_id,
            user_email = %self.user_email,
            operation = OPERATION
        )
    }
}
