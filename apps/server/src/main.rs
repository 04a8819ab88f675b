//! Folio search server entry point

use anyhow::Context;
use folio::{api::create_router, config::Config, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first to get logging settings
    let config = Config::load().context("Failed to load configuration")?;

    // Validate configuration
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    // Initialize logging and optional span export
    let _telemetry_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging/telemetry")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.logging.deployment_environment,
        "Starting Folio search server"
    );

    let addr = config
        .socket_addr()
        .context("Failed to determine socket address")?;

    tracing::info!(
        listen_addr = %addr,
        default_limit = config.search.default_limit,
        max_limit = config.search.max_limit,
        query_timeout_ms = config.search.query_timeout_ms,
        "Configuration loaded"
    );

    // Initialize application state (pool, migrations, search service)
    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;

    // Create router
    let app = create_router(state);

    // Start server
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Search endpoint: http://{}/api/v1/search", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;

    // Run server with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server terminated unexpectedly");
        logging::shutdown_telemetry();
        return Err(e.into());
    }

    // Flush spans before exit (the guard also does this on drop)
    tracing::info!("Server shutdown complete");
    logging::shutdown_telemetry();

    Ok(())
}

/// Resolves on SIGTERM or SIGINT.
/// Container runtimes send SIGTERM, Ctrl+C sends SIGINT.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("Failed to install SIGTERM signal handler");
    let sigint = tokio::signal::ctrl_c();

    tokio::select! {
        _ = sigint => {
            tracing::info!("SIGINT received, starting graceful shutdown...");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, starting graceful shutdown...");
        }
    }
}

/// Resolves on Ctrl+C on non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
