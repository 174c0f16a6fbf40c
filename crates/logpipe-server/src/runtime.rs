//! Process bootstrap shared by the service binaries: configuration path
//! resolution, tracing setup, startup, and graceful shutdown.

use crate::config::{Config, ConfigError, LoggingConfig};
use crate::{collector_app, forwarder_app, CollectorState, ForwarderState};
use logpipe_forwarder::{Forwarder, HttpTransport};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Errors that abort a service before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The store never became ready.
    #[error(transparent)]
    Database(#[from] logpipe_db::InitError),

    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking startup task panicked.
    #[error("startup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Picks the configuration file: first CLI argument, then
/// `LOGPIPE_CONFIG_PATH`, then `logpipe.toml`. Also returns where the path
/// came from, for the startup log line.
pub fn resolve_config_path() -> (String, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("LOGPIPE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("logpipe.toml".to_string(), "default")
}

/// Installs the global tracing subscriber described by `logging`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Loads configuration and installs tracing. Configuration errors are
/// returned before any subscriber exists, so binaries print them directly.
pub fn bootstrap(service: &str) -> Result<Config, ConfigError> {
    let (path, source) = resolve_config_path();
    let config = crate::config::load_config(Some(&path))?;
    init_tracing(&config.logging);
    tracing::info!(service, source, path = %path, "resolved startup configuration path");
    if !std::path::Path::new(&path).exists() {
        tracing::info!(path = %path, "config file not found, using defaults");
    }
    Ok(config)
}

/// Brings the store to the ready state and serves the collector until a
/// shutdown signal arrives.
///
/// # Errors
///
/// Returns `StartupError::Database` if schema initialization exhausts its
/// attempts, or an I/O error if the listener cannot be bound.
pub async fn run_collector(config: Config) -> Result<(), StartupError> {
    let db = config.database.clone();
    let pool = tokio::task::spawn_blocking(move || {
        logpipe_db::open_with_retry(&db.path, db.runtime_settings(), db.init_policy())
    })
    .await??;

    let state = CollectorState {
        pool,
        fallback_id: config.store.fallback_id,
    };
    let addr = SocketAddr::new(config.collector.host, config.collector.port);

    tracing::info!(%addr, fallback_id = ?state.fallback_id, "starting log collector");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, collector_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("log collector shut down");
    Ok(())
}

/// Serves the forwarder until a shutdown signal arrives. A missing
/// collector URL is logged but does not prevent startup.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the listener
/// cannot be bound.
pub async fn run_forwarder(config: Config) -> Result<(), StartupError> {
    let settings = &config.forwarder;
    let transport = match &settings.collector_url {
        Some(url) => Some(HttpTransport::new(url.clone(), settings.timeout())?),
        None => {
            tracing::warn!(
                "LOGPIPE_COLLECTOR_URL is not set; every forwarded event will fail until it is configured"
            );
            None
        }
    };

    let policy = settings.retry_policy();
    let state = ForwarderState {
        forwarder: Forwarder::new(transport, policy),
    };
    let addr = SocketAddr::new(settings.host, settings.port);

    tracing::info!(
        %addr,
        collector_url = settings.collector_url.as_deref().unwrap_or("<unset>"),
        max_attempts = policy.max_attempts,
        initial_backoff_ms = u64::try_from(policy.initial_backoff.as_millis()).unwrap_or(u64::MAX),
        "starting log forwarder"
    );
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, forwarder_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("log forwarder shut down");
    Ok(())
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
