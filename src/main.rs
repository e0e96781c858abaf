//! SmallSpark - local business search service
//!
//! Serves ranked, filterable business listings around a point, built from
//! OpenStreetMap data fetched on demand and cached per area.
//!
//! Module structure:
//! - `domain/` - Core business types (raw elements, business records)
//! - `io/` - External interfaces (Overpass, Nominatim, HTTP API)
//! - `services/` - Business logic (Taxonomy, Normalizer, Cache, Search)
//! - `infra/` - Infrastructure (Config, Catalog, Metrics)

use clap::Parser;
use smallspark::infra::{Catalog, Config, Metrics};
use smallspark::io::{start_api_server, AppState, GeocodeClient, OverpassClient};
use smallspark::services::images::ImageSelector;
use smallspark::services::{AreaCache, Normalizer, Taxonomy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// SmallSpark - local business search API
#[derive(Parser, Debug)]
#[command(name = "smallspark", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full request visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "smallspark starting");

    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    // Category tables and image pools: embedded catalog unless overridden
    let catalog = match config.catalog_file() {
        Some(path) => Arc::new(Catalog::from_file(path)?),
        None => Arc::new(Catalog::builtin()),
    };

    // Log configuration
    info!(
        config_file = %config.config_file(),
        bind_address = %config.server_bind_address(),
        port = %config.server_port(),
        overpass_mirrors = ?config.overpass_mirrors(),
        cache_ttl_secs = %config.cache_ttl_secs(),
        default_radius_m = %config.default_radius_m(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create shared components
    let metrics = Arc::new(Metrics::new());
    let taxonomy = Arc::new(Taxonomy::new(catalog.clone()));
    let normalizer = Arc::new(Normalizer::new(taxonomy.clone(), ImageSelector::new(catalog)));
    let fetcher = Arc::new(OverpassClient::new(&config)?);
    let cache = AreaCache::new(
        Duration::from_secs(config.cache_ttl_secs()),
        fetcher,
        normalizer,
        metrics.clone(),
    );
    let geocoder = GeocodeClient::new(&config)?;

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the API server until shutdown
    let state = Arc::new(AppState { config, cache, taxonomy, geocoder, metrics });
    start_api_server(state, shutdown_rx).await?;

    info!("smallspark shutdown complete");
    Ok(())
}
