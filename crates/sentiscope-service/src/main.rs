//! Sentiscope Service
//!
//! Serves sentiment predictions from a pre-trained classifier and
//! bag-of-words vectorizer, downloading them from a release on first start.

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use sentiscope_service::telemetry::{init_metrics, init_tracing};
use sentiscope_service::{create_router, Cli, ServiceConfig, Startup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    info!("Starting sentiscope service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load(&cli)?;
    info!(
        repository = %config.model_repo,
        model_version = %config.model_version,
        model_path = %config.model_path.display(),
        vectorizer_path = %config.vectorizer_path.display(),
        "Configuration loaded"
    );

    let metrics_handle = init_metrics()?;

    let mut startup = Startup::from_config(config.clone())?;
    let context = startup.run().await?.with_metrics(metrics_handle);

    // Bind only once the model is ready
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, create_router(context))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
