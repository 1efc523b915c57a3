//! Test helpers for common testing patterns
//!
//! Provides utility functions for building exporter configs and waiting on
//! background subscription tasks.

use brpc_core::config::{
    ConnectionParameters, ConnectionTimeouts, EndpointConfig, ExporterConfig, LoggingConfig,
    NetworkType, ScrapeConfig, ServerConfig,
};
use serde_json::{json, Value};
use std::time::Duration;

/// Builds a minimal valid [`ExporterConfig`] for `collector` over `endpoints`.
///
/// Each endpoint is a `(url, provider)` pair.
#[must_use]
pub fn exporter_config(
    collector: &str,
    blockchain: &str,
    chain_id: Option<u64>,
    endpoints: &[(&str, &str)],
) -> ExporterConfig {
    ExporterConfig {
        blockchain: blockchain.to_string(),
        chain_id,
        network_name: "testnet".to_string(),
        network_type: NetworkType::Testnet,
        collector: collector.to_string(),
        integration_maturity: None,
        canonical_name: None,
        chain_selector: None,
        connection_parameters: ConnectionParameters::default(),
        endpoints: endpoints
            .iter()
            .map(|(url, provider)| EndpointConfig {
                url: (*url).to_string(),
                provider: (*provider).to_string(),
            })
            .collect(),
        allowed_providers: None,
        server: ServerConfig::default(),
        logging: LoggingConfig::default(),
        scrape: ScrapeConfig::default(),
    }
}

/// Sub-second timings so reconnects and the stale watchdog fire within a test.
#[must_use]
pub fn fast_timeouts() -> ConnectionTimeouts {
    ConnectionTimeouts {
        open: Duration::from_millis(500),
        close: Duration::from_millis(100),
        response: Duration::from_millis(500),
        ping_interval: Duration::from_secs(5),
        ping_timeout: Duration::from_secs(5),
        idle: Duration::from_secs(5),
        reconnect_initial: Duration::from_millis(50),
        reconnect_max: Duration::from_millis(200),
    }
}

/// A `newHeads` notification frame for `block_number`.
#[must_use]
pub fn new_heads_notification(block_number: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": {
            "subscription": "0x9ce59a13059e417087c02d3236a0b9cc",
            "result": {
                "number": format!("0x{block_number:x}"),
                "hash": format!("0x{block_number:064x}"),
                "parentHash": format!("0x{:064x}", block_number.saturating_sub(1)),
                "timestamp": format!("0x{:x}", 1_600_000_000 + block_number)
            }
        }
    })
}

/// Polls `condition` every 20ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_config_is_valid() {
        let config =
            exporter_config("solana", "solana", None, &[("https://rpc.example.com", "alpha")]);
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoints[0].provider, "alpha");
    }

    #[test]
    fn test_new_heads_notification() {
        let frame = new_heads_notification(255);
        assert_eq!(frame["params"]["result"]["number"], "0xff");
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        assert!(!wait_until(Duration::from_millis(50), || false).await);
        assert!(wait_until(Duration::from_millis(50), || true).await);
    }
}
