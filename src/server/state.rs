//! Shared application state

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::ingestion::IngestionPipeline;
use crate::processing::StatisticsAggregator;
use crate::store::{SqliteUserStore, StoreError, UserStore};

use super::config::ServerConfig;

/// State shared by all handlers.
///
/// The store is opened once and shared by the pipeline and the aggregator for the process
/// lifetime. `run_guard` serializes uploads so at most one run touches the store at a time.
pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: IngestionPipeline,
    pub aggregator: StatisticsAggregator,
    pub(crate) run_guard: Mutex<()>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Connect to the configured SQLite store.
    pub fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let store = Arc::new(SqliteUserStore::connect(&config.database_url)?);
        Ok(Self::with_store(config, store))
    }

    /// Build state around an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        Self {
            config,
            pipeline: IngestionPipeline::new(Arc::clone(&store)),
            aggregator: StatisticsAggregator::new(store),
            run_guard: Mutex::new(()),
        }
    }
}
