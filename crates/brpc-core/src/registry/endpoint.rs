use super::ChainFamily;
use crate::{
    config::{EndpointConfig, ExporterConfig},
    utils::redacted_host,
};

/// Label names, in export order.
pub const LABEL_NAMES: [&str; 6] =
    ["url", "provider", "blockchain", "network_name", "network_type", "evmChainID"];

/// Label values identifying every series of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointLabels {
    pub url: String,
    pub provider: String,
    pub blockchain: String,
    pub network_name: String,
    pub network_type: String,
    /// Decimal chain id, or `"None"` for chains without one.
    pub chain_id: String,
}

impl EndpointLabels {
    /// Values in [`LABEL_NAMES`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 6] {
        [
            &self.url,
            &self.provider,
            &self.blockchain,
            &self.network_name,
            &self.network_type,
            &self.chain_id,
        ]
    }

    /// `(name, value)` pairs in [`LABEL_NAMES`] order.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        LABEL_NAMES.into_iter().zip(self.values())
    }
}

/// Immutable descriptor of one probed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    host: String,
    provider: String,
    family: ChainFamily,
    chain_id: Option<u64>,
    labels: EndpointLabels,
}

impl Endpoint {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        provider: impl Into<String>,
        family: ChainFamily,
        chain_id: Option<u64>,
        labels: EndpointLabels,
    ) -> Self {
        let url = url.into();
        let host = redacted_host(&url);
        Self { url, host, provider: provider.into(), family, chain_id, labels }
    }

    /// Builds the descriptor for one configured endpoint.
    #[must_use]
    pub fn from_config(
        config: &ExporterConfig,
        endpoint: &EndpointConfig,
        family: ChainFamily,
    ) -> Self {
        let labels = EndpointLabels {
            url: endpoint.url.clone(),
            provider: endpoint.provider.clone(),
            blockchain: config.blockchain.clone(),
            network_name: config.network_name.clone(),
            network_type: config.network_type.as_str().to_string(),
            chain_id: config.chain_id.map_or_else(|| "None".to_string(), |id| id.to_string()),
        };
        Self::new(&endpoint.url, &endpoint.provider, family, config.chain_id, labels)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hostname only; safe to log.
    #[must_use]
    pub fn redacted_host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn family(&self) -> ChainFamily {
        self.family
    }

    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    #[must_use]
    pub fn labels(&self) -> &EndpointLabels {
        &self.labels
    }
}
