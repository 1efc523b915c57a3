//! Endpoint descriptors and collector construction.

pub mod endpoint;
pub mod family;

pub use endpoint::{Endpoint, EndpointLabels, LABEL_NAMES};
pub use family::{ChainFamily, RegistryError, TransportKind};

use crate::{
    collectors::{profile_for, CollectorProfile, EndpointCollector, QueryCollector, SubscriptionCollector},
    config::ExporterConfig,
    transport::{HttpsTransport, QueryTransport, WsQueryTransport},
};
use std::sync::Arc;
use tracing::info;

/// Collectors for every configured endpoint, in configuration order.
pub struct CollectorRegistry {
    family: ChainFamily,
    collectors: Vec<Arc<dyn EndpointCollector>>,
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("family", &self.family)
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

impl CollectorRegistry {
    /// Builds one collector per endpoint. Subscribing families start their
    /// background tasks here, so this must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedCollector`] for an unknown family and
    /// [`RegistryError::InvalidEndpoint`] when a transport cannot be built.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, RegistryError> {
        let family = ChainFamily::resolve(&config.collector, &config.blockchain)?;
        let timeouts = config.connection_parameters.timeouts();

        let mut collectors: Vec<Arc<dyn EndpointCollector>> = Vec::with_capacity(config.endpoints.len());
        for endpoint_config in &config.endpoints {
            let endpoint = Endpoint::from_config(config, endpoint_config, family);

            let collector: Arc<dyn EndpointCollector> = match profile_for(family, config.chain_id) {
                CollectorProfile::Subscription(profile) => {
                    Arc::new(SubscriptionCollector::spawn(endpoint, profile, timeouts))
                }
                CollectorProfile::Query(profile) => {
                    let transport: Arc<dyn QueryTransport> = match family.transport() {
                        TransportKind::Https => Arc::new(
                            HttpsTransport::new(endpoint.url(), &timeouts).map_err(|e| {
                                RegistryError::InvalidEndpoint {
                                    host: endpoint.redacted_host().to_string(),
                                    reason: e.to_string(),
                                }
                            })?,
                        ),
                        TransportKind::WebSocketQuery | TransportKind::Subscription => {
                            Arc::new(WsQueryTransport::new(endpoint.url(), timeouts))
                        }
                    };
                    Arc::new(QueryCollector::new(endpoint, transport, profile))
                }
            };
            collectors.push(collector);
        }

        info!(
            family = %family,
            blockchain = %config.blockchain,
            network = %config.network_name,
            endpoints = collectors.len(),
            "collectors registered"
        );

        Ok(Self { family, collectors })
    }

    /// Wraps prebuilt collectors.
    #[must_use]
    pub fn new(family: ChainFamily, collectors: Vec<Arc<dyn EndpointCollector>>) -> Self {
        Self { family, collectors }
    }

    #[must_use]
    pub fn family(&self) -> ChainFamily {
        self.family
    }

    #[must_use]
    pub fn collectors(&self) -> &[Arc<dyn EndpointCollector>] {
        &self.collectors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Stops every background subscription.
    pub fn shutdown(&self) {
        for collector in &self.collectors {
            collector.shutdown();
        }
    }
}
