//! Registry server binary.
//!
//! Runs the share registry: publish/view for snapshots, chat writes with
//! server-side authorization, per-IP rate limiting, and the optional
//! expiry sweep.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use rollbook_server::api::{self, AppState};
use rollbook_server::config::ServerConfig;
use rollbook_server::rate_limit::RateLimiter;
use rollbook_server::registry::ShareStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rollbook_server=debug")),
        )
        .init();

    info!("Starting rollbook registry server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Share store (creates directory if missing)
    let shares = Arc::new(
        ShareStore::new(config.share_storage_path.clone(), config.share_ttl).await?,
    );

    let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);

    let app_state = AppState {
        shares: shares.clone(),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict windows idle >10 min)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale(std::time::Duration::from_secs(600)).await;
        }
    });

    // Periodic expiry sweep (every 10 minutes; only spawned when a TTL is set)
    if config.share_ttl.is_some() {
        let shares = shares.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
            loop {
                interval.tick().await;
                if let Err(e) = shares.sweep_expired().await {
                    tracing::error!(error = %e, "expiry sweep failed");
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
