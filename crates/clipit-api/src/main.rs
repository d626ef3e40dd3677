//! Axum API server binary.

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipit_api::{create_router, ApiConfig, AppState, ServiceConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // rustls 0.23 needs a process-wide crypto provider; ignore if one is set.
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing();

    if let Err(e) = run().await {
        error!("clipit-api failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("clipit_api=info,clipit_worker=info,clipit_storage=info,clipit_firestore=info,tower_http=info")
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting clipit-api");

    let service = ServiceConfig::from_env().context("invalid service configuration")?;
    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        cors_origin = %config.cors_origin,
        environment = %config.environment,
        key_file = %service.key.path.display(),
        project_id = service.key.project_id.as_deref().unwrap_or("-"),
        storage_endpoint = %service.storage.endpoint_url,
        "API config loaded"
    );

    let state = AppState::from_env(config.clone(), &service)
        .context("failed to create application state")?;

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(clipit_api::metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
