//! Request/response transports used during a scrape.
//!
//! Both variants share one contract: send a request, validate the reply, return the
//! payload or `None`. Failures are logged here and never surface to collectors as
//! errors.
//!
//! ```text
//!   cached_query(req) ──► QueryMemo ── hit ──► memoized Option<Value>
//!                             │
//!                           miss (single flight per fingerprint)
//!                             ▼
//!                        query(req) ──► HTTPS POST/GET  or  short-lived WebSocket
//!                             │
//!                       LatencySlot (consume-once)
//! ```

pub mod errors;
pub mod http;
pub mod validation;
pub mod ws;

pub use errors::ProbeError;
pub use http::HttpsTransport;
pub use ws::WsQueryTransport;

use crate::{cache::QueryCache, utils::canonical_json};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};

/// A single probe request and the way its reply is validated.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcQuery {
    /// JSON-RPC request; the reply must carry a non-null `result` and no `error`.
    JsonRpc(Value),

    /// Non JSON-RPC dialect; the reply's top-level `key` is returned as is.
    SkipChecks { payload: Value, key: &'static str },

    /// REST-style GET relative to the endpoint URL; the reply is plain JSON.
    RestGet { path: &'static str, params: Vec<(String, String)> },
}

impl RpcQuery {
    /// Stable cache key for this request.
    ///
    /// Payloads are serialized with sorted keys, so equal payloads always collide.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            Self::JsonRpc(payload) => format!("rpc:{}", canonical_json(payload)),
            Self::SkipChecks { payload, key } => format!("raw:{key}:{}", canonical_json(payload)),
            Self::RestGet { path, params } => {
                let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("rest:{path}?{}", query.join("&"))
            }
        }
    }

    /// Method name for log lines.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::JsonRpc(payload) | Self::SkipChecks { payload, .. } => payload
                .get("method")
                .or_else(|| payload.get("methodname"))
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
            Self::RestGet { path, .. } => *path,
        }
    }
}

/// Most recent round-trip time, consumed on read.
#[derive(Debug, Default)]
pub struct LatencySlot {
    latest: Mutex<Option<Duration>>,
}

impl LatencySlot {
    pub fn record(&self, elapsed: Duration) {
        *self.latest.lock() = Some(elapsed);
    }

    /// Returns the last measurement and clears it, so a value is reported at most once.
    pub fn take(&self) -> Option<Duration> {
        self.latest.lock().take()
    }
}

/// Per-cycle memo in front of a transport.
///
/// Absence is memoized as well: an endpoint that timed out once in a cycle is not
/// asked the same question again until [`QueryMemo::clear`]. Concurrent callers with
/// the same fingerprint wait for the first one instead of issuing their own request.
#[derive(Debug, Default)]
pub struct QueryMemo {
    cache: Mutex<QueryCache<Option<Value>>>,
    in_flight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl QueryMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized value for `key`, running `fetch` only on the first miss.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Option<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Value>>,
    {
        let cached = self.cache.lock().retrieve(key);
        if let Some(hit) = cached {
            return hit;
        }

        let flight = self.in_flight.entry(key.to_string()).or_default().clone();
        let _guard = flight.lock().await;

        let cached = self.cache.lock().retrieve(key);
        if let Some(hit) = cached {
            return hit;
        }

        let value = fetch().await;
        self.cache.lock().store(key, value.clone());
        value
    }

    /// Forgets every memoized reply. Called once per endpoint at the start of a scrape.
    pub fn clear(&self) {
        self.cache.lock().clear();
        self.in_flight.clear();
    }

    #[must_use]
    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.lock().is_cached(key)
    }
}

/// Request/response access to one endpoint.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Sends `request` and returns the validated payload, or `None` on any failure.
    async fn query(&self, request: &RpcQuery) -> Option<Value>;

    /// The memo backing [`QueryTransport::cached_query`].
    fn memo(&self) -> &QueryMemo;

    /// Consume-once round-trip time of the last successful exchange.
    fn latency(&self) -> Option<Duration>;

    /// Like [`QueryTransport::query`], but hits the network at most once per
    /// fingerprint per cycle.
    async fn cached_query(&self, request: &RpcQuery) -> Option<Value> {
        let key = request.fingerprint();
        self.memo().get_or_fetch(&key, || self.query(request)).await
    }

    /// Starts a new scrape cycle.
    fn reset_cycle(&self) {
        self.memo().clear();
    }
}
