use super::{EndpointCollector, FieldProbe, QueryProfile};
use crate::{
    registry::Endpoint,
    transport::QueryTransport,
    utils::{quantity_f64, quantity_u64, version_string},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Request/response collector for every non-subscribing family.
pub struct QueryCollector {
    endpoint: Endpoint,
    transport: Arc<dyn QueryTransport>,
    profile: QueryProfile,
}

impl std::fmt::Debug for QueryCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCollector")
            .field("endpoint", &self.endpoint.redacted_host())
            .field("family", &self.endpoint.family())
            .finish_non_exhaustive()
    }
}

impl QueryCollector {
    #[must_use]
    pub fn new(endpoint: Endpoint, transport: Arc<dyn QueryTransport>, profile: QueryProfile) -> Self {
        Self { endpoint, transport, profile }
    }

    async fn probe(&self, probe: &FieldProbe) -> Option<Value> {
        let result = self.transport.cached_query(&probe.query).await?;
        probe.select(&result)
    }

    fn decode<T, E: std::fmt::Display>(
        &self,
        metric: &'static str,
        value: &Value,
        decode: impl FnOnce(&Value) -> Result<T, E>,
    ) -> Option<T> {
        match decode(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint.redacted_host(),
                    metric,
                    error = %e,
                    "failed to decode probe result"
                );
                None
            }
        }
    }
}

#[async_trait]
impl EndpointCollector for QueryCollector {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn reset_cycle(&self) {
        self.transport.reset_cycle();
    }

    async fn alive(&self) -> Option<bool> {
        Some(self.transport.cached_query(&self.profile.liveness).await.is_some())
    }

    async fn block_height(&self) -> Option<u64> {
        let value = self.probe(self.profile.block_height.as_ref()?).await?;
        self.decode("block_height", &value, quantity_u64)
    }

    async fn client_version(&self) -> Option<String> {
        let value = self.probe(self.profile.client_version.as_ref()?).await?;
        let version = version_string(&value);
        if version.is_none() {
            warn!(endpoint = %self.endpoint.redacted_host(), value = %value, "unexpected client version");
        }
        version
    }

    async fn total_difficulty(&self) -> Option<f64> {
        let value = self.probe(self.profile.total_difficulty.as_ref()?).await?;
        self.decode("total_difficulty", &value, quantity_f64)
    }

    fn latency(&self) -> Option<Duration> {
        self.transport.latency()
    }
}
