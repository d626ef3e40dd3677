//! Job launcher.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use clipit_firestore::UserStore;
use clipit_models::{ClipJobRequest, JobId};
use clipit_storage::UploadRelay;

use crate::error::WorkerResult;
use crate::job::ClipJob;
use crate::metrics;
use crate::processor::ClipProcessor;

/// Schedules clip jobs.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Mark the user's upload as incomplete and schedule the job.
    ///
    /// Returns once the job is scheduled; its outcome is only visible
    /// through the user record.
    async fn submit(&self, request: ClipJobRequest) -> WorkerResult<JobId>;
}

/// Runs each job as an unsupervised tokio task.
///
/// No handle is kept: jobs are never cancelled, timed out or retried, and
/// two jobs for the same user may interleave their flag updates.
#[derive(Clone)]
pub struct DetachedJobLauncher {
    users: Arc<dyn UserStore>,
    processor: Arc<dyn ClipProcessor>,
    relay: UploadRelay,
    enhanced: bool,
}

impl DetachedJobLauncher {
    pub fn new(
        users: Arc<dyn UserStore>,
        processor: Arc<dyn ClipProcessor>,
        relay: UploadRelay,
        enhanced: bool,
    ) -> Self {
        Self {
            users,
            processor,
            relay,
            enhanced,
        }
    }
}

#[async_trait]
impl JobLauncher for DetachedJobLauncher {
    async fn submit(&self, request: ClipJobRequest) -> WorkerResult<JobId> {
        self.users
            .set_upload_complete(&request.user_email, false)
            .await?;

        let job = ClipJob::new(
            request,
            self.enhanced,
            Arc::clone(&self.users),
            Arc::clone(&self.processor),
            self.relay.clone(),
        );
        let job_id = job.id.clone();
        let span = job.logger().span();

        tokio::spawn(job.execute().instrument(span));
        metrics::record_job_submitted();

        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use clipit_firestore::MemoryUserStore;
    use clipit_models::{UploadStatus, UserRecord};
    use clipit_storage::MemoryObjectStore;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use crate::error::WorkerError;
    use crate::processor::ProcessedClip;

    /// Writes fixed outputs after an optional gate opens.
    struct FakeProcessor {
        dir: TempDir,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    impl FakeProcessor {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                gate: None,
                fail: false,
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ClipProcessor for FakeProcessor {
        async fn process(&self, request: &ClipJobRequest, enhanced: bool) -> WorkerResult<ProcessedClip> {
            assert!(enhanced);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(WorkerError::processing_failed(format!("bad link {}", request.link)));
            }
            let video: PathBuf = self.dir.path().join("clip.mp4");
            let metadata: PathBuf = self.dir.path().join("clip.json");
            tokio::fs::write(&video, b"video").await?;
            tokio::fs::write(&metadata, b"{}").await?;
            Ok(ProcessedClip::new(video, metadata))
        }
    }

    struct Harness {
        users: Arc<MemoryUserStore>,
        store: Arc<MemoryObjectStore>,
        launcher: DetachedJobLauncher,
    }

    fn harness(processor: FakeProcessor) -> Harness {
        let users = Arc::new(MemoryUserStore::new());
        let store = Arc::new(MemoryObjectStore::new());
        let launcher = DetachedJobLauncher::new(
            users.clone(),
            Arc::new(processor),
            UploadRelay::new(store.clone()),
            true,
        );
        Harness {
            users,
            store,
            launcher,
        }
    }

    async fn wait_for_status(users: &MemoryUserStore, email: &str, status: UploadStatus) -> UserRecord {
        for _ in 0..200 {
            if let Some(user) = users.user(email) {
                if user.upload_status == Some(status) {
                    return user;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("user {} never reached status {}", email, status);
    }

    #[tokio::test]
    async fn test_flag_is_false_until_job_finishes() {
        let gate = Arc::new(Notify::new());
        let h = harness(FakeProcessor::gated(gate.clone()));

        h.launcher
            .submit(ClipJobRequest::new("https://youtu.be/x", "a@x.com"))
            .await
            .unwrap();

        let user = h.users.user("a@x.com").unwrap();
        assert_eq!(user.upload_complete, Some(false));
        assert_eq!(user.upload_status, Some(UploadStatus::Processing));

        gate.notify_one();
        let user = wait_for_status(&h.users, "a@x.com", UploadStatus::Complete).await;
        assert_eq!(user.upload_complete, Some(true));
        assert_eq!(
            h.users.flag_writes(),
            vec![("a@x.com".to_string(), false), ("a@x.com".to_string(), true)]
        );
        assert!(h.store.contains("a@x.com/CurrentRun/clip.mp4"));
        assert!(h.store.contains("a@x.com/PreviousRuns/clip.json"));
    }

    #[tokio::test]
    async fn test_processing_failure_leaves_flag_false() {
        let h = harness(FakeProcessor::failing());

        h.launcher
            .submit(ClipJobRequest::new("https://youtu.be/bad", "a@x.com"))
            .await
            .unwrap();

        let user = wait_for_status(&h.users, "a@x.com", UploadStatus::Failed).await;
        assert_eq!(user.upload_complete, Some(false));
        assert!(user.upload_error.unwrap().contains("bad link"));
        assert!(h.store.upload_log().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_records_storage_cause() {
        let h = harness(FakeProcessor::new());
        h.store.fail_upload_for("a@x.com/CurrentRun/clip.json");

        h.launcher
            .submit(ClipJobRequest::new("https://youtu.be/x", "a@x.com"))
            .await
            .unwrap();

        let user = wait_for_status(&h.users, "a@x.com", UploadStatus::Failed).await;
        assert_eq!(user.upload_complete, Some(false));
        assert_eq!(h.users.flag_writes(), vec![("a@x.com".to_string(), false)]);

        // The store's own message reaches the user record.
        let reason = user.upload_error.unwrap();
        assert!(reason.starts_with("Storage error: Upload failed"), "{}", reason);
        assert!(reason.contains("a@x.com/CurrentRun/clip.json"), "{}", reason);
    }

    #[tokio::test]
    async fn test_submit_fails_when_flag_cannot_be_written() {
        let h = harness(FakeProcessor::new());
        h.users.set_fail_writes(true);

        let result = h
            .launcher
            .submit(ClipJobRequest::new("https://youtu.be/x", "a@x.com"))
            .await;

        assert!(matches!(result, Err(WorkerError::Firestore(_))));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.store.upload_log().is_empty());
    }
}
