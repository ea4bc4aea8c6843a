//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rollbook_shared::constants::{DEFAULT_HTTP_PORT, MAX_SNAPSHOT_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path where published snapshots are stored.
    /// Env: `SHARE_STORAGE_PATH`
    /// Default: `./shares`
    pub share_storage_path: PathBuf,

    /// How long a published code stays valid.
    /// Env: `SHARE_TTL_SECS` (`0` or unset = codes live forever)
    /// Default: lifetime.
    pub share_ttl: Option<Duration>,

    /// Maximum accepted snapshot size in bytes.
    /// Env: `MAX_SNAPSHOT_SIZE`
    /// Default: 5 MiB.
    pub max_snapshot_size: usize,

    /// Requests allowed per client IP per rate-limit window.
    /// Env: `RATE_LIMIT_MAX`
    /// Default: `60`
    pub rate_limit_max: u32,

    /// Length of the rate-limit window.
    /// Env: `RATE_LIMIT_WINDOW_SECS`
    /// Default: `10`
    pub rate_limit_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            share_storage_path: PathBuf::from("./shares"),
            share_ttl: None,
            max_snapshot_size: MAX_SNAPSHOT_SIZE,
            rate_limit_max: 60,
            rate_limit_window: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("SHARE_STORAGE_PATH") {
            config.share_storage_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("SHARE_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(0) => config.share_ttl = None,
                Ok(secs) => config.share_ttl = Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid SHARE_TTL_SECS, using default");
                }
            }
        }

        if let Ok(val) = std::env::var("MAX_SNAPSHOT_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_snapshot_size = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_SNAPSHOT_SIZE, using default");
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_MAX") {
            if let Ok(n) = val.parse::<u32>() {
                config.rate_limit_max = n;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_WINDOW_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.rate_limit_window = Duration::from_secs(n);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.share_ttl.is_none());
        assert_eq!(config.max_snapshot_size, MAX_SNAPSHOT_SIZE);
    }
}
