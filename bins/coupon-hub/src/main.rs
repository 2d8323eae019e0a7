//! coupon-hub: round-robin coupon dispenser with per-identity cooldowns.
//!
//! Serves a web UI at `/` and a REST API under `/api`, handing out one
//! coupon per identity per cooldown window. All state is in memory and is
//! lost on restart.

use std::sync::Arc;

use anyhow::{Context, Result};
use coupon_core::clock::{Clock, SystemClock};
use coupon_core::{Allocator, Gatekeeper};
use tokio::sync::Mutex;
use tracing::info;

mod config;
mod routes;

use config::Config;

/// Gatekeeper shared by all handlers. One lock covers the whole
/// check/allocate/record sequence of a claim.
pub type SharedGatekeeper = Arc<Mutex<Gatekeeper<Arc<dyn Clock>>>>;

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Claim gatekeeper, which owns the coupon allocator.
    pub gatekeeper: SharedGatekeeper,
    /// Server configuration.
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load coupon-hub configuration")?;
    let pool = config.load_pool()?;

    info!(
        bind = %config.bind_addr,
        cooldown_secs = config.cooldown_secs,
        prune_interval_secs = config.prune_interval_secs,
        pool_size = pool.len(),
        "Starting coupon-hub"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gatekeeper = Gatekeeper::new(Allocator::new(pool), config.cooldown(), clock);

    let state = AppState {
        gatekeeper: Arc::new(Mutex::new(gatekeeper)),
        config: Arc::new(config.clone()),
    };

    spawn_pruner(state.gatekeeper.clone(), &config);

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Periodically drop claim records whose cooldown has lapsed.
fn spawn_pruner(gatekeeper: SharedGatekeeper, config: &Config) {
    let period = config.prune_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = gatekeeper.lock().await.prune_expired();
            if removed > 0 {
                info!(removed, "Pruned lapsed claim records");
            }
        }
    });
}
