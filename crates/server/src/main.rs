use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lensdesk_core::{
    load_config, validate_config, AnalysisSource, FsAnalysisSource, HelpdeskConnector,
    HttpConnector, Reconciler, RetryStore, SqliteRetryStore,
};
use lensdesk_server::api::create_router;
use lensdesk_server::state::AppState;
use lensdesk_server::sweeper::SweepScheduler;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    let json_logs = std::env::var("LENSDESK_LOG_FORMAT").is_ok_and(|v| v == "json");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Determine config path
    let config_path = std::env::var("LENSDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Retry database path: {:?}", config.retry.database_path);
    info!("Analysis root: {:?}", config.analysis.root_dir);
    if config.helpdesk.token.is_none() {
        warn!("Helpdesk token not configured; every invocation will fail until it is set");
    }

    let store: Arc<dyn RetryStore> = Arc::new(
        SqliteRetryStore::new(&config.retry.database_path, config.retry.ttl())
            .context("Failed to open retry store")?,
    );
    info!("Retry store initialized");

    let source: Arc<dyn AnalysisSource> = Arc::new(FsAnalysisSource::new(&config.analysis.root_dir));
    let connector: Arc<dyn HelpdeskConnector> =
        Arc::new(HttpConnector::new(config.helpdesk.clone()));

    let reconciler = Arc::new(Reconciler::new(&config, connector, store, source));
    let state = Arc::new(AppState::new(config.clone(), reconciler));

    // Start the sweep loop if enabled
    let scheduler = if config.sweep.enabled {
        let scheduler = SweepScheduler::new(
            Arc::clone(&state),
            Duration::from_secs(config.sweep.interval_secs),
        );
        scheduler.start().await;
        Some(scheduler)
    } else {
        info!("Scheduled sweeps disabled in config");
        None
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
        info!("Sweep loop stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
