use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use worldsync::api::create_app;
use worldsync::config::ServerConfig;
use worldsync::session::{BroadcastFanout, SessionRegistry};
use worldsync::state::WorldStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    info!("worldsync starting...");

    // Shared state: the world and the live sessions it fans out to
    let store = Arc::new(WorldStore::new());
    let registry = Arc::new(SessionRegistry::new());
    let listener_id = BroadcastFanout::attach(&store, Arc::clone(&registry));
    info!(listener = %listener_id, "Broadcast fan-out attached");

    let app = create_app(Arc::clone(&store), Arc::clone(&registry), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        static_dir = %config.static_dir.display(),
        idle_timeout_seconds = config.idle_timeout_seconds,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(
        entities = store.len(),
        sessions = registry.len(),
        "worldsync stopped"
    );

    Ok(())
}

/// Resolves on ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        // Keep serving; only a real signal stops the server
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
