//! One background clip job.

use std::sync::Arc;
use std::time::Instant;

use clipit_firestore::UserStore;
use clipit_models::{ClipJobRequest, JobId};
use clipit_storage::UploadRelay;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::processor::ClipProcessor;

/// A job bound to its collaborators, ready to run.
pub struct ClipJob {
    pub id: JobId,
    pub request: ClipJobRequest,
    pub enhanced: bool,
    users: Arc<dyn UserStore>,
    processor: Arc<dyn ClipProcessor>,
    relay: UploadRelay,
}

impl ClipJob {
    pub fn new(
        request: ClipJobRequest,
        enhanced: bool,
        users: Arc<dyn UserStore>,
        processor: Arc<dyn ClipProcessor>,
        relay: UploadRelay,
    ) -> Self {
        Self {
            id: JobId::new(),
            request,
            enhanced,
            users,
            processor,
            relay,
        }
    }

    pub fn logger(&self) -> JobLogger {
        JobLogger::new(&self.id, &self.request.user_email)
    }

    /// Run to completion, logging failures instead of returning them.
    ///
    /// On failure the user's `upload_complete` flag is left false and the
    /// record is marked failed when the store allows it.
    pub async fn execute(self) {
        let logger = self.logger();
        let started = Instant::now();
        logger.started(&self.request.link);

        match self.run(&logger).await {
            Ok(()) => {
                metrics::record_job_completed(started.elapsed().as_secs_f64());
                logger.completed(started.elapsed());
            }
            Err((stage, e)) => {
                metrics::record_job_failed(stage, started.elapsed().as_secs_f64());
                logger.failed(stage, &e);

                if let Err(record_err) = self
                    .users
                    .record_upload_failure(&self.request.user_email, &e.to_string())
                    .await
                {
                    logger.side_effect_failed("record the failure", &record_err);
                }
            }
        }
    }

    /// Process, upload, then mark the user's upload complete.
    ///
    /// Errors carry the stage they came from.
    pub async fn run(&self, logger: &JobLogger) -> Result<(), (&'static str, WorkerError)> {
        let clip = self
            .processor
            .process(&self.request, self.enhanced)
            .await
            .map_err(|e| ("process", e))?;
        logger.stage_done("process");

        let pair = clip.upload_pair(&self.request.user_email);
        self.relay
            .try_upload_pair(&pair)
            .await
            .map_err(|e| ("upload", WorkerError::from(e)))?;
        drop(clip);

        self.mark_complete().await.map_err(|e| ("finalize", e))
    }

    async fn mark_complete(&self) -> WorkerResult<()> {
        self.users
            .set_upload_complete(&self.request.user_email, true)
            .await?;
        Ok(())
    }
}
