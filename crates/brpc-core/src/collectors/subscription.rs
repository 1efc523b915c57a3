use super::{EndpointCollector, SubscriptionProfile};
use crate::{
    config::ConnectionTimeouts,
    registry::Endpoint,
    subscription::SubscriptionManager,
    transport::{QueryTransport, WsQueryTransport},
    utils::version_string,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Collector backed by a long-lived head subscription.
///
/// Health, heads and block height come from the subscription state; the client
/// version is fetched over a separate short-lived WebSocket connection.
pub struct SubscriptionCollector {
    endpoint: Endpoint,
    manager: SubscriptionManager,
    queries: Arc<dyn QueryTransport>,
    profile: SubscriptionProfile,
}

impl std::fmt::Debug for SubscriptionCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionCollector")
            .field("endpoint", &self.endpoint.redacted_host())
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl SubscriptionCollector {
    /// Starts the subscription task and returns the collector wrapping it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(endpoint: Endpoint, profile: SubscriptionProfile, timeouts: ConnectionTimeouts) -> Self {
        let manager = SubscriptionManager::spawn(endpoint.url(), profile.subscribe.clone(), timeouts);
        let queries = Arc::new(WsQueryTransport::new(endpoint.url(), timeouts));
        Self::new(endpoint, manager, queries, profile)
    }

    #[must_use]
    pub fn new(
        endpoint: Endpoint,
        manager: SubscriptionManager,
        queries: Arc<dyn QueryTransport>,
        profile: SubscriptionProfile,
    ) -> Self {
        Self { endpoint, manager, queries, profile }
    }

    #[must_use]
    pub fn manager(&self) -> &SubscriptionManager {
        &self.manager
    }
}

#[async_trait]
impl EndpointCollector for SubscriptionCollector {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn reset_cycle(&self) {
        self.queries.reset_cycle();
    }

    async fn alive(&self) -> Option<bool> {
        Some(self.manager.alive())
    }

    async fn block_height(&self) -> Option<u64> {
        self.manager.block_height(self.profile.height_field)
    }

    async fn client_version(&self) -> Option<String> {
        let value = self.queries.cached_query(&self.profile.client_version).await?;
        version_string(&value)
    }

    fn disconnects(&self) -> Option<u64> {
        Some(self.manager.disconnects())
    }

    fn heads_received(&self) -> Option<u64> {
        Some(self.manager.heads_received())
    }

    /// Last ping round trip; kept across cycles until the next pong replaces it.
    fn latency(&self) -> Option<Duration> {
        self.manager.latency()
    }

    fn shutdown(&self) {
        self.manager.shutdown();
    }
}
