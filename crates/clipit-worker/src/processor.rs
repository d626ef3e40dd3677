//! The external clip processor.
//!
//! The processor turns a video link into one short video and a JSON
//! metadata file. Its internals are opaque; only its outputs matter here.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use clipit_models::ClipJobRequest;
use clipit_storage::UploadPair;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Lines of stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Outputs of one processing run.
///
/// Owns the scratch directory when there is one; it is removed on drop.
#[derive(Debug)]
pub struct ProcessedClip {
    pub video_path: PathBuf,
    pub metadata_path: PathBuf,
    workdir: Option<TempDir>,
}

impl ProcessedClip {
    /// Outputs living outside any scratch directory.
    pub fn new(video_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            metadata_path: metadata_path.into(),
            workdir: None,
        }
    }

    /// Outputs inside `workdir`, cleaned up together with it.
    pub fn in_workdir(workdir: TempDir, video_path: PathBuf, metadata_path: PathBuf) -> Self {
        Self {
            video_path,
            metadata_path,
            workdir: Some(workdir),
        }
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_ref().map(|d| d.path())
    }

    /// Upload description for `user_email`, named after the local files.
    pub fn upload_pair(&self, user_email: &str) -> UploadPair {
        UploadPair::from_paths(user_email, &self.video_path, &self.metadata_path)
    }
}

/// Produces clips from a video link.
#[async_trait]
pub trait ClipProcessor: Send + Sync {
    /// Process `request.link` for `request.user_email`.
    async fn process(&self, request: &ClipJobRequest, enhanced: bool) -> WorkerResult<ProcessedClip>;
}

/// Runs an external program per job.
///
/// Invoked as `<program> --link <url> --user <email> --output-dir <dir>
/// [--enhanced]`; the first `.mp4` and first `.json` written to the output
/// directory (by name) are the job's outputs.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
    work_dir: PathBuf,
}

impl CommandProcessor {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.processor_cmd.clone(), config.work_dir.clone())
    }

    /// Arguments for one run.
    pub fn build_args(request: &ClipJobRequest, output_dir: &Path, enhanced: bool) -> Vec<String> {
        let mut args = vec![
            "--link".to_string(),
            request.link.clone(),
            "--user".to_string(),
            request.user_email.clone(),
            "--output-dir".to_string(),
            output_dir.display().to_string(),
        ];
        if enhanced {
            args.push("--enhanced".to_string());
        }
        args
    }
}

#[async_trait]
impl ClipProcessor for CommandProcessor {
    async fn process(&self, request: &ClipJobRequest, enhanced: bool) -> WorkerResult<ProcessedClip> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let workdir = tempfile::Builder::new()
            .prefix("clipit-job-")
            .tempdir_in(&self.work_dir)?;

        let args = Self::build_args(request, workdir.path(), enhanced);
        debug!(program = %self.program, ?args, "Running clip processor");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                WorkerError::processing_failed(format!("Failed to run {}: {}", self.program, e))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if !line.trim().is_empty() {
                debug!("processor stdout: {}", line.trim());
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(WorkerError::processing_failed(format!(
                "{} exited with {}: {}",
                self.program, output.status, tail
            )));
        }

        let video = find_output(workdir.path(), "mp4").await?;
        let metadata = find_output(workdir.path(), "json").await?;
        info!(video = %video.display(), metadata = %metadata.display(), "Clip processor finished");

        Ok(ProcessedClip::in_workdir(workdir, video, metadata))
    }
}

/// First file in `dir` with the given extension, by name.
async fn find_output(dir: &Path, extension: &str) -> WorkerResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_match = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if is_match && entry.file_type().await?.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    matches.into_iter().next().ok_or_else(|| {
        WorkerError::processing_failed(format!("processor produced no .{} file", extension))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let request = ClipJobRequest::new("https://youtu.be/x", "a@x.com");
        let args = CommandProcessor::build_args(&request, Path::new("/tmp/out"), true);
        assert_eq!(
            args,
            vec![
                "--link",
                "https://youtu.be/x",
                "--user",
                "a@x.com",
                "--output-dir",
                "/tmp/out",
                "--enhanced"
            ]
        );

        let args = CommandProcessor::build_args(&request, Path::new("/tmp/out"), false);
        assert!(!args.contains(&"--enhanced".to_string()));
    }

    #[tokio::test]
    async fn test_find_output_picks_first_by_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"v").unwrap();
        std::fs::write(dir.path().join("a.MP4"), b"v").unwrap();
        std::fs::write(dir.path().join("a.json"), b"{}").unwrap();

        let video = find_output(dir.path(), "mp4").await.unwrap();
        assert_eq!(video.file_name().unwrap(), "a.MP4");
        let metadata = find_output(dir.path(), "json").await.unwrap();
        assert_eq!(metadata.file_name().unwrap(), "a.json");
    }

    #[tokio::test]
    async fn test_find_output_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_output(dir.path(), "mp4").await,
            Err(WorkerError::ProcessingFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let dir = TempDir::new().unwrap();
        let processor = CommandProcessor::new("clipit-no-such-program", dir.path());
        let request = ClipJobRequest::new("https://youtu.be/x", "a@x.com");

        let err = processor.process(&request, true).await.unwrap_err();
        assert!(matches!(err, WorkerError::ProcessingFailed(_)));
    }

    #[test]
    fn test_processed_clip_upload_pair() {
        let clip = ProcessedClip::new("/tmp/w/clip.mp4", "/tmp/w/clip.json");
        let pair = clip.upload_pair("a@x.com");
        assert_eq!(pair.video_name, "clip.mp4");
        assert_eq!(pair.metadata_name, "clip.json");
        assert!(clip.workdir().is_none());
    }
}
