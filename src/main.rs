//! CSV import server CLI
//!
//! Run with: `cargo run -- --help`

use clap::Parser;
use csv_user_import::server::{init_logging, ImportServer, ServerConfig, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Exits with a usage error when CSV_FILE_PATH or DATABASE_URL is missing.
    let config = ServerConfig::parse();

    let telemetry_config = TelemetryConfig::with_server_config(&config);
    init_logging(&telemetry_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        csv_file_path = %config.csv_file_path.display(),
        addr = %config.listen_addr(),
        log_format = ?telemetry_config.log_format,
        "Starting csv-user-import"
    );

    let server = ImportServer::new(config)?;
    server.run().await?;
    Ok(())
}
