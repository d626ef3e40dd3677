//! Axum HTTP API server.
//!
//! This crate provides:
//! - Clip job submission (fire-and-forget background processing)
//! - Signed download URLs for a user's clips
//! - Payment plan and upload status lookups
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError, ServiceAccountKey, ServiceConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
