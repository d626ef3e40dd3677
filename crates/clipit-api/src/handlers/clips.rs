//! Signed URL listing.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::middleware::USER_EMAIL_HEADER;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedUrlsQuery {
    /// Prefix to list; defaults to `{email}/CurrentRun/`
    pub directory: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlsResponse {
    pub signed_urls: Vec<String>,
}

/// Signed download URLs for the caller's `.mp4` clips.
///
/// The caller is identified by the `User-Email` header, which is trusted
/// as is.
pub async fn get_signed_urls(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SignedUrlsQuery>,
) -> ApiResult<Json<SignedUrlsResponse>> {
    let user_email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("User email is required"))?;

    let signed_urls = state
        .clips
        .list_user_clips(user_email, query.directory.as_deref())
        .await?;

    debug!(user_email, count = signed_urls.len(), "Signed URLs issued");
    Ok(Json(SignedUrlsResponse { signed_urls }))
}
