//! Configuration management for the server.

use std::env;

/// Change sets journaled between two snapshots when `SNAPSHOT_INTERVAL` is unset.
const DEFAULT_SNAPSHOT_INTERVAL: u32 = 200;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL. Without it the server keeps state in memory only.
    pub database_url: Option<String>,
    /// Shared secret expected in bearer tokens
    pub auth_secret: Option<String>,
    /// Journaled change sets between two snapshots
    pub snapshot_interval: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            auth_secret: None,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let snapshot_interval = match env::var("SNAPSHOT_INTERVAL") {
            Ok(value) => value
                .parse()
                .ok()
                .filter(|interval| *interval > 0)
                .ok_or(ConfigError::InvalidSnapshotInterval)?,
            Err(_) => DEFAULT_SNAPSHOT_INTERVAL,
        };

        Ok(Self {
            host,
            port,
            database_url,
            auth_secret,
            snapshot_interval,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("SNAPSHOT_INTERVAL must be a positive integer")]
    InvalidSnapshotInterval,
}
