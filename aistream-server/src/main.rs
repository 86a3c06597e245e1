//! AI Streamer (aistream-server) - Main entry point
//!
//! Loads configuration, builds the DashScope-backed session and serves the
//! HTTP/WebSocket API until Ctrl+C or SIGTERM.

use std::sync::Arc;

use aistream_server::api::{self, AppContext};
use aistream_server::config::{CliArgs, Config};
use aistream_server::generation::DashScopeClient;
use aistream_server::Session;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config = Config::load(&args).context("Failed to load configuration")?;

    // RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "aistream_server={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting AI Streamer v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr()
    );
    if config.dashscope.api_key.is_none() {
        warn!("DashScope API key not set; synthesis will fail until one is configured");
    }

    let client = DashScopeClient::new(&config.dashscope)
        .context("Failed to create DashScope client")?;
    let session = Arc::new(Session::new(
        Arc::new(client),
        config.voice.clone(),
        &config.stream,
    ));
    info!(
        "Session {} ready (batch size {}, poll interval {}ms)",
        session.id(),
        config.stream.batch_size,
        config.stream.poll_interval_ms
    );

    let ctx = AppContext::new(session).with_static_dir(config.static_dir.clone());
    api::run(&config, ctx, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
