//! Liveness and readiness probes.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Liveness: the process is up and serving.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Outcome of one dependency probe.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Probe {
    Ok { latency_ms: u64 },
    Error { error: String },
}

impl Probe {
    async fn run<E, F>(check: F) -> Self
    where
        E: Display,
        F: Future<Output = Result<(), E>>,
    {
        let start = Instant::now();
        match check.await {
            Ok(()) => Probe::Ok {
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => Probe::Error {
                error: e.to_string(),
            },
        }
    }

    fn is_ok(&self) -> bool {
        matches!(self, Probe::Ok { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub firestore: Probe,
    pub storage: Probe,
}

/// Readiness: both stores answer. 503 with per-store detail otherwise.
pub async fn ready(State(state): State<AppState>) -> Response {
    let (firestore, storage) = tokio::join!(
        Probe::run(state.users.check_connectivity()),
        Probe::run(state.clips.store().check_connectivity()),
    );

    let healthy = firestore.is_ok() && storage.is_ok();
    let body = Readiness {
        status: if healthy { "ready" } else { "degraded" },
        checks: ReadinessChecks { firestore, storage },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}
