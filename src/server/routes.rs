//! HTTP route handlers and router configuration

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use super::error::Result;
use super::state::AppState;

/// Body returned after a completed upload.
pub const UPLOAD_FINISHED_MESSAGE: &str = "CSV upload and import finished.";

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", get(upload))
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    tracing::debug!("health check requested");
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ingest the configured CSV file, then print the age distribution.
///
/// Responds only after every row has been processed. A failed aggregation is logged and does
/// not change the response.
pub async fn upload(State(state): State<Arc<AppState>>) -> Result<&'static str> {
    let _run = state.run_guard.lock().await;

    let report = state.pipeline.run(&state.config.csv_file_path).await?;
    info!(
        inserted = report.stats.inserted,
        skipped = report.stats.skipped,
        failed = report.stats.failed,
        "upload processed"
    );

    match state.aggregator.compute().await {
        Ok(distribution) => println!("\n{distribution}"),
        Err(e) => error!(error = %e, "error generating age group report"),
    }

    Ok(UPLOAD_FINISHED_MESSAGE)
}
