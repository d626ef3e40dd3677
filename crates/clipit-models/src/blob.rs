//! Object key layout.
//!
//! Every clip lives under `{user_email}/{folder}/{filename}` where the
//! folder is either `CurrentRun` (latest outputs, overwritten) or
//! `PreviousRuns` (accumulated history).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination folder of an uploaded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RunFolder {
    /// Outputs of the most recent job.
    CurrentRun,
    /// Outputs of every job so far.
    PreviousRuns,
}

impl RunFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunFolder::CurrentRun => "CurrentRun",
            RunFolder::PreviousRuns => "PreviousRuns",
        }
    }
}

impl fmt::Display for RunFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prefix of a user's folder, with a trailing slash.
pub fn run_prefix(user_email: &str, folder: RunFolder) -> String {
    format!("{}/{}/", user_email, folder)
}

/// Full object key of a file in a user's folder.
pub fn blob_key(user_email: &str, folder: RunFolder, filename: &str) -> String {
    format!("{}{}", run_prefix(user_email, folder), filename)
}

/// True if the key names an MP4 video (case-insensitive).
pub fn is_video_key(key: &str) -> bool {
    key.to_lowercase().ends_with(".mp4")
}

/// Content type for an uploaded file, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".mp4") {
        "video/mp4"
    } else if lower.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key_layout() {
        assert_eq!(
            blob_key("a@x.com", RunFolder::CurrentRun, "clip.mp4"),
            "a@x.com/CurrentRun/clip.mp4"
        );
        assert_eq!(
            blob_key("a@x.com", RunFolder::PreviousRuns, "clip.json"),
            "a@x.com/PreviousRuns/clip.json"
        );
        assert_eq!(run_prefix("u", RunFolder::CurrentRun), "u/CurrentRun/");
    }

    #[test]
    fn test_is_video_key_ignores_case() {
        assert!(is_video_key("u/CurrentRun/a.mp4"));
        assert!(is_video_key("u/CurrentRun/B.MP4"));
        assert!(!is_video_key("u/CurrentRun/a.json"));
        assert!(!is_video_key("u/CurrentRun/mp4"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("clip.MP4"), "video/mp4");
        assert_eq!(content_type_for("clip.json"), "application/json");
        assert_eq!(content_type_for("clip.txt"), "application/octet-stream");
    }
}
