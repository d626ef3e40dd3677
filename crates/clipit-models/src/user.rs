//! Per-user record in the document store.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Plan reported for users whose record has no `paymentPlan` field.
pub const DEFAULT_PAYMENT_PLAN: &str = "free";

/// Field names as stored in the `users` collection.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const PAYMENT_PLAN: &str = "paymentPlan";
    pub const UPLOAD_COMPLETE: &str = "upload_complete";
    pub const UPLOAD_STATUS: &str = "upload_status";
    pub const UPLOAD_ERROR: &str = "upload_error";
    pub const UPLOAD_UPDATED_AT: &str = "upload_updated_at";
}

/// State of the user's most recent background job.
///
/// Complements the boolean `upload_complete` flag, which cannot tell a
/// running job from a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Job submitted and not finished
    Processing,
    /// Job finished without error
    Complete,
    /// Job raised; `upload_complete` stays false
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Complete => "complete",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(UploadStatus::Processing),
            "complete" => Some(UploadStatus::Complete),
            "failed" => Some(UploadStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record keyed by email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserRecord {
    pub email: String,
    #[serde(rename = "paymentPlan", default)]
    pub payment_plan: Option<String>,
    #[serde(default)]
    pub upload_complete: Option<bool>,
    #[serde(default)]
    pub upload_status: Option<UploadStatus>,
    #[serde(default)]
    pub upload_error: Option<String>,
    #[serde(default)]
    pub upload_updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Stored plan, or `"free"` when the field is absent.
    pub fn payment_plan_or_default(&self) -> &str {
        self.payment_plan.as_deref().unwrap_or(DEFAULT_PAYMENT_PLAN)
    }

    /// Flag value, treating an absent field as "not complete".
    pub fn is_upload_complete(&self) -> bool {
        self.upload_complete.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_plan_defaults_to_free() {
        let user = UserRecord::new("a@x.com");
        assert_eq!(user.payment_plan_or_default(), "free");

        let user = UserRecord {
            payment_plan: Some("pro".to_string()),
            ..UserRecord::new("b@x.com")
        };
        assert_eq!(user.payment_plan_or_default(), "pro");
    }

    #[test]
    fn test_upload_status_round_trip_names() {
        for status in [UploadStatus::Processing, UploadStatus::Complete, UploadStatus::Failed] {
            assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UploadStatus::parse("unknown"), None);
    }

    #[test]
    fn test_record_uses_stored_field_names() {
        let user: UserRecord =
            serde_json::from_str(r#"{"email":"b@x.com","paymentPlan":"pro","upload_complete":true}"#)
                .unwrap();
        assert_eq!(user.payment_plan.as_deref(), Some("pro"));
        assert!(user.is_upload_complete());
    }
}
