use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reqs_window_exporter::config::Config;
use reqs_window_exporter::metrics::GaugeRegistry;
use reqs_window_exporter::store::{timed, EventStore, RedisEventStore};
use reqs_window_exporter::window::SystemClock;
use reqs_window_exporter::{server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_level).context("initialize tracing subscriber")?;

    if let Err(err) = run(config).await {
        error!(error = ?err, "fatal error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    config.validate().context("invalid configuration")?;

    // ── 1. Connect to the store ──────────────────────────────────
    // Without the store nothing works, so this is the one fatal path.
    let store_url = config.store_url();
    info!(url = %store_url, collection = %config.collection, "connecting to event store");
    let store = timed(
        config.store_timeout(),
        RedisEventStore::connect(&store_url, &config.collection),
    )
    .await
    .with_context(|| format!("connect to event store at {store_url}"))?;

    timed(config.store_timeout(), store.ensure_collection())
        .await
        .context("verify event collection")?;
    info!("event store ready");

    if config.check_store {
        return Ok(());
    }

    // ── 2. Build shared state ────────────────────────────────────
    let registry = Arc::new(GaugeRegistry::new().context("register gauges")?);
    let state = Arc::new(AppState::new(
        Arc::new(store),
        registry,
        Arc::new(SystemClock),
        config.scrape_settings(),
    ));

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "ctrl_c listener error");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn init_tracing(filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
