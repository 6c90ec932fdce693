//! HTTP surface for the importer.
//!
//! A thin axum wrapper around [`crate::ingestion::IngestionPipeline`] and
//! [`crate::processing::StatisticsAggregator`]:
//!
//! - `GET /upload`: ingest the configured CSV file and print the age distribution
//! - `GET /health`: liveness probe

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ServerError;
pub use state::AppState;
pub use telemetry::{init_logging, TelemetryConfig};

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::store::StoreError;

/// CSV import HTTP server
pub struct ImportServer {
    state: Arc<AppState>,
    router: Router,
}

impl ImportServer {
    /// Open the store and build the router.
    pub fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let state = Arc::new(AppState::new(config)?);
        let router = routes::build_router(state.clone());
        Ok(Self { state, router })
    }

    /// Get a reference to the application state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.state.config.listen_addr();
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Server is running");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
