//! User record lookups.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use clipit_firestore::FirestoreError;
use clipit_models::UploadStatus;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    fn require(self) -> ApiResult<String> {
        self.email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::bad_request("Email is required"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlanResponse {
    pub payment_plan: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusResponse {
    pub upload_complete: bool,
    pub upload_status: Option<UploadStatus>,
    pub upload_error: Option<String>,
}

fn user_not_found(e: FirestoreError) -> ApiError {
    if e.is_not_found() {
        ApiError::not_found(USER_NOT_FOUND_MESSAGE)
    } else {
        ApiError::from(e)
    }
}

/// Payment plan of a user, `"free"` when none is recorded.
pub async fn get_payment_plan(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<PaymentPlanResponse>> {
    let email = query.require()?;

    let payment_plan = state
        .users
        .get_payment_plan(&email)
        .await
        .map_err(user_not_found)?;

    Ok(Json(PaymentPlanResponse { payment_plan }))
}

/// State of the user's latest clip job.
pub async fn get_upload_status(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<UploadStatusResponse>> {
    let email = query.require()?;

    let user = state
        .users
        .get_user(&email)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND_MESSAGE))?;

    Ok(Json(UploadStatusResponse {
        upload_complete: user.is_upload_complete(),
        upload_status: user.upload_status,
        upload_error: user.upload_error,
    }))
}
