use anyhow::Result;
use axum::serve;
use brpc_core::{
    config::{ExporterConfig, LoggingConfig},
    registry::CollectorRegistry,
    scrape::ScrapeOrchestrator,
};
use rustls::crypto::{ring::default_provider, CryptoProvider};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes logging. `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,brpc_core={level},server={level},cli={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("Failed to install crypto provider: {e:?}"))?;

    let config = ExporterConfig::load()
        .map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;

    init_logging(&config.logging);
    info!(
        blockchain = %config.blockchain,
        network = %config.network_name,
        collector = %config.collector,
        "Starting blockchain RPC exporter"
    );

    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;
    debug!(
        endpoints_count = config.endpoints.len(),
        bind_port = config.server.bind_port,
        gate_on_alive = config.scrape.gate_on_alive,
        "Configuration loaded"
    );

    let registry = CollectorRegistry::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Collector registry initialization failed: {e}"))?;
    let orchestrator =
        Arc::new(ScrapeOrchestrator::new(registry.collectors().to_vec(), config.scrape.clone()));

    let app = server::create_app(orchestrator);
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.bind_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Metrics server listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    registry.shutdown();
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");

                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, stopping subscriptions");
}
