//! Clip job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a background job, used for log correlation only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A video link submitted for processing on behalf of a user.
///
/// Transient: consumed once by the job launcher and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipJobRequest {
    /// Video source link
    pub link: String,
    /// Email of the requesting user, also the storage folder name
    pub user_email: String,
}

impl ClipJobRequest {
    pub fn new(link: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            user_email: user_email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_request_wire_names() {
        let req: ClipJobRequest =
            serde_json::from_str(r#"{"link":"https://youtu.be/x","userEmail":"a@x.com"}"#).unwrap();
        assert_eq!(req, ClipJobRequest::new("https://youtu.be/x", "a@x.com"));
    }
}
