// pm-agent-server: HTTP service for the project-management assistant
//
// Responsibilities:
// - Own the data directory (task store, project log, reports, risk records)
// - Migrate legacy task records on startup
// - Serve the REST API until Ctrl-C

use std::sync::Arc;

use anyhow::{Context, Result};
use pm_agent_lib::{
    api::{router, AppState},
    config::Config,
    persistence::{cleanup_stale_temps, CLEANUP_AGE_THRESHOLD},
    store::migration::migrate_store,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env();

    // Ensure data directory exists
    config
        .ensure_dirs()
        .context("Failed to create data directory")?;

    if config.is_server_running() {
        anyhow::bail!("Server already running (PID: {:?})", config.read_pid());
    }

    // Write PID file
    config.write_pid().context("Failed to write PID file")?;

    let removed = cleanup_stale_temps(&config.data_dir, CLEANUP_AGE_THRESHOLD);
    if removed > 0 {
        tracing::info!("Removed {} stale temp file(s)", removed);
    }

    if !config.gemini.has_api_key() {
        tracing::warn!("GEMINI_API_KEY not set; plans will use the fallback parser");
    }

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::from_config(config.clone()).context("Failed to initialize server state")?);

    match migrate_store(state.store.as_ref(), &state.log, &state.config.migration_marker()) {
        Ok(0) => {}
        Ok(n) => tracing::info!("Flagged {} legacy blocked task(s)", n),
        Err(e) => tracing::error!("Task store migration failed: {}", e),
    }

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("PM Agent API listening on http://{}", bind_addr);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    if let Err(e) = config.remove_pid() {
        tracing::warn!("Failed to remove PID file: {}", e);
    }
    served
}
