//! Sentilens Server
//!
//! Batch sentiment classification over HTTP.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use sentilens_server::{create_router, AppState, Cli, LogFormat, ServerConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.log_format);

    info!("Starting Sentilens server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!(
        "Model: {:?} '{}' on {}",
        config.model.backend, config.model.name_or_path, config.model.device
    );
    info!(
        "Batch size: {}, preprocessing: {:?}",
        config.engine.batch_size, config.jobs.preprocessing
    );

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let state = AppState::new(&config, metrics_handle)?;
    if cli.preload {
        info!("Preloading sentiment model...");
        if let Err(e) = state.runner.engine().initialize().await {
            warn!("Model preload failed, jobs will fail until restart: {}", e);
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = create_router(state, config.cors_allow_any_origin);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sentilens=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sentilens=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentilens_jobs_submitted_total",
        "Total number of classification jobs submitted"
    );
    metrics::describe_counter!(
        "sentilens_jobs_completed_total",
        "Total number of jobs that completed"
    );
    metrics::describe_counter!(
        "sentilens_jobs_failed_total",
        "Total number of jobs that failed"
    );
    metrics::describe_counter!(
        "sentilens_texts_classified_total",
        "Total number of texts classified"
    );
    metrics::describe_histogram!(
        "sentilens_batch_latency_us",
        metrics::Unit::Microseconds,
        "Batch classification latency in microseconds"
    );
    metrics::describe_counter!(
        "sentilens_corrections_total",
        "Total number of manual label corrections"
    );
    metrics::describe_gauge!(
        "sentilens_jobs_registered",
        "Number of jobs held in the registry"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
