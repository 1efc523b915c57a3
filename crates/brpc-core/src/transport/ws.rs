use super::{validation, LatencySlot, ProbeError, QueryMemo, QueryTransport, RpcQuery};
use crate::{config::ConnectionTimeouts, utils::redacted_host};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};

/// WebSocket request/response transport.
///
/// Every query opens its own short-lived connection, sends one frame, waits for one
/// reply, and closes. It never shares the long-lived subscription socket.
pub struct WsQueryTransport {
    url: String,
    host: String,
    timeouts: ConnectionTimeouts,
    memo: QueryMemo,
    latency: LatencySlot,
}

impl std::fmt::Debug for WsQueryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsQueryTransport").field("host", &self.host).finish_non_exhaustive()
    }
}

impl WsQueryTransport {
    #[must_use]
    pub fn new(url: impl Into<String>, timeouts: ConnectionTimeouts) -> Self {
        let url = url.into();
        let host = redacted_host(&url);
        Self { url, host, timeouts, memo: QueryMemo::new(), latency: LatencySlot::default() }
    }

    async fn exchange(&self, payload: &Value) -> Result<String, ProbeError> {
        let started = Instant::now();

        let (mut stream, _) = timeout(self.timeouts.open, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(|e| ProbeError::from_ws(&e))?;

        timeout(self.timeouts.response, stream.send(Message::Text(payload.to_string().into())))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(|e| ProbeError::from_ws(&e))?;

        let reply = timeout(self.timeouts.response, async {
            while let Some(frame) = stream.next().await {
                match frame.map_err(|e| ProbeError::from_ws(&e))? {
                    Message::Text(text) => return Ok(text.to_string()),
                    Message::Binary(bytes) => {
                        return String::from_utf8(bytes.to_vec())
                            .map_err(|e| ProbeError::InvalidJson(e.to_string()));
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Err(ProbeError::ConnectionFailed("closed before reply".to_string()))
        })
        .await
        .map_err(|_| ProbeError::Timeout)??;

        self.latency.record(started.elapsed());

        if let Err(e) = timeout(self.timeouts.close, stream.close(None)).await {
            trace!(endpoint = %self.host, error = %e, "close handshake timed out");
        }

        Ok(reply)
    }
}

#[async_trait]
impl QueryTransport for WsQueryTransport {
    async fn query(&self, request: &RpcQuery) -> Option<Value> {
        debug!(endpoint = %self.host, method = request.method(), "sending websocket query");

        let result = match request {
            RpcQuery::JsonRpc(payload) => {
                self.exchange(payload).await.and_then(|body| validation::json_rpc_result(&body))
            }
            RpcQuery::SkipChecks { payload, key } => self
                .exchange(payload)
                .await
                .and_then(|body| validation::top_level_key(&body, key)),
            RpcQuery::RestGet { .. } => Err(ProbeError::Unsupported("REST GET")),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    endpoint = %self.host,
                    method = request.method(),
                    error = %e,
                    "websocket query failed"
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
