//! # triage-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the incident triage pipeline.
//! Binds to configurable port (default 8080).

use triage_api::bootstrap::build_pipeline;
use triage_api::config::PipelineConfig;
use triage_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("TRIAGE_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let pipeline_config = PipelineConfig::from_env().map_err(|e| {
        tracing::error!("Invalid pipeline configuration: {e}");
        e
    })?;
    let pipeline = build_pipeline(&pipeline_config).map_err(|e| {
        tracing::error!("Pipeline bootstrap failed: {e}");
        e
    })?;

    let config = AppConfig::from_env();
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; every caller is treated as a reviewer");
    }
    let port = config.port;
    let app = triage_api::app(AppState::with_pipeline(pipeline, config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Triage API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
