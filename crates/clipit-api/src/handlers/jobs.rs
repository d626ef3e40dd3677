//! Clip job submission.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use clipit_models::ClipJobRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const PROCESSING_STARTED_MESSAGE: &str = "YouTube video processing started";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoRequest {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

/// Schedule background processing of a video link.
///
/// Returns as soon as the job is scheduled; completion is reported through
/// the user's upload status.
pub async fn process_youtube_video(
    State(state): State<AppState>,
    body: Result<Json<ProcessVideoRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let link = required(body.link, "No YouTube link provided")?;
    let user_email = required(body.user_email, "No user ID provided")?;

    let job_id = state
        .launcher
        .submit(ClipJobRequest::new(link, user_email.clone()))
        .await?;

    info!(job_id = %job_id, user_email = %user_email, "Clip job scheduled");

    Ok(Json(MessageResponse {
        message: PROCESSING_STARTED_MESSAGE.to_string(),
    }))
}
