use super::{validation, LatencySlot, ProbeError, QueryMemo, QueryTransport, RpcQuery};
use crate::{config::ConnectionTimeouts, utils::redacted_host};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("brpc-exporter/", env!("CARGO_PKG_VERSION"));

/// HTTPS request/response transport.
///
/// JSON-RPC requests are POSTed to the endpoint URL, REST requests are sent as GETs
/// relative to it. Only `200 OK` is accepted.
pub struct HttpsTransport {
    url: String,
    host: String,
    client: Client,
    memo: QueryMemo,
    latency: LatencySlot,
}

impl std::fmt::Debug for HttpsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpsTransport").field("host", &self.host).finish_non_exhaustive()
    }
}

impl HttpsTransport {
    /// Creates a transport with independent connect and response timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ConnectionFailed`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeouts: &ConnectionTimeouts) -> Result<Self, ProbeError> {
        let url = url.into();
        let host = redacted_host(&url);

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(timeouts.open)
            .timeout(timeouts.open + timeouts.response)
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(endpoint = %host, error = %e, "failed to build http client");
                ProbeError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { url, host, client, memo: QueryMemo::new(), latency: LatencySlot::default() })
    }

    async fn send(&self, request: &RpcQuery) -> Result<Value, ProbeError> {
        let started = Instant::now();

        let builder = match request {
            RpcQuery::JsonRpc(payload) | RpcQuery::SkipChecks { payload, .. } => {
                self.client.post(&self.url).json(payload)
            }
            RpcQuery::RestGet { path, params } => {
                let url = format!("{}{}", self.url.trim_end_matches('/'), path);
                self.client.get(url).query(params)
            }
        };

        let response = builder.send().await.map_err(ProbeError::from_reqwest)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProbeError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(ProbeError::from_reqwest)?;
        self.latency.record(started.elapsed());

        match request {
            RpcQuery::JsonRpc(_) => validation::json_rpc_result(&body),
            RpcQuery::SkipChecks { key, .. } => validation::top_level_key(&body, key),
            RpcQuery::RestGet { .. } => validation::parse_json(&body),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpsTransport {
    async fn query(&self, request: &RpcQuery) -> Option<Value> {
        debug!(endpoint = %self.host, method = request.method(), "sending https query");

        match self.send(request).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    endpoint = %self.host,
                    method = request.method(),
                    error = %e,
                    "https query failed"
                );
                None
            }
        }
    }

    fn memo(&self) -> &QueryMemo {
        &self.memo
    }

    fn latency(&self) -> Option<Duration> {
        self.latency.take()
    }
}
