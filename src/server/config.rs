//! Server configuration

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// CSV import server configuration.
///
/// Every option can come from a flag or from its environment variable. The CSV path and the
/// database URL are required; startup fails before serving when either is missing.
#[derive(Parser, Debug, Clone)]
#[command(name = "csv-user-import")]
#[command(about = "Imports a CSV of users into a relational store and reports an age distribution")]
pub struct ServerConfig {
    /// CSV file ingested on every `GET /upload`
    #[arg(long, env = "CSV_FILE_PATH")]
    pub csv_file_path: PathBuf,

    /// Store connection string (`sqlite://<path>`, `sqlite::memory:` or a bare path)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Address to bind
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Config with the two required inputs and defaults for everything else.
    pub fn new(csv_file_path: impl Into<PathBuf>, database_url: impl Into<String>) -> Self {
        Self {
            csv_file_path: csv_file_path.into(),
            database_url: database_url.into(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            log_level: "info".to_string(),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use clap::Parser;

    #[test]
    fn parses_flags() {
        let cfg = ServerConfig::try_parse_from([
            "csv-user-import",
            "--csv-file-path",
            "users.csv",
            "--database-url",
            "sqlite::memory:",
            "--port",
            "8080",
        ])
        .unwrap();
        assert_eq!(cfg.csv_file_path.to_str(), Some("users.csv"));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.listen_addr().port(), 8080);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn defaults_match_new() {
        let cfg = ServerConfig::new("a.csv", "b.db");
        assert_eq!(cfg.listen_addr().to_string(), "0.0.0.0:3000");
    }
}
