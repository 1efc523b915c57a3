use brpc_core::{
    config::ExporterConfig, registry::CollectorRegistry, scrape::ScrapeOrchestrator,
};
use std::time::Duration;
use tracing::info;

use super::utils::{print_info, CliResult};

/// Options of the one-shot `probe` command.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Time given to subscriptions to connect and receive heads before scraping.
    pub settle: Duration,
}

/// Builds every collector, waits for subscriptions to settle, runs one scrape and
/// prints the Prometheus text exposition.
pub async fn run_probe(config: &ExporterConfig, options: &ProbeOptions) -> CliResult<()> {
    config.validate()?;

    let registry = CollectorRegistry::from_config(config)?;
    print_info(&format!(
        "Probing {} {} endpoint(s) of {} {}",
        registry.len(),
        registry.family(),
        config.blockchain,
        config.network_name
    ));

    if !options.settle.is_zero() {
        info!(settle_secs = options.settle.as_secs(), "waiting for subscriptions to settle");
        tokio::time::sleep(options.settle).await;
    }

    let orchestrator =
        ScrapeOrchestrator::new(registry.collectors().to_vec(), config.scrape.clone());
    let metrics = orchestrator.collect().await;
    registry.shutdown();

    print!("{}", metrics.render(orchestrator.namespace()));
    Ok(())
}
