//! Per-endpoint metric extraction.
//!
//! Every endpoint gets one [`EndpointCollector`]. The trait is the only surface the
//! scrape sees: each method returns a value or `None`, and `None` covers both "this
//! family cannot report it" and "not available right now". Families differ only in
//! the fixed data held by their [`CollectorProfile`]; two strategies interpret it:
//!
//! - [`SubscriptionCollector`]: live heads from a [`SubscriptionManager`] plus short
//!   WebSocket queries (evm, conflux)
//! - [`QueryCollector`]: request/response probes over HTTPS or WebSocket (everything else)
//!
//! [`SubscriptionManager`]: crate::subscription::SubscriptionManager

pub mod profiles;
pub mod query;
pub mod subscription;

pub use profiles::{profile_for, CollectorProfile, FieldProbe, QueryProfile, SubscriptionProfile};
pub use query::QueryCollector;
pub use subscription::SubscriptionCollector;

use crate::registry::Endpoint;
use async_trait::async_trait;
use std::time::Duration;

/// Metrics a collector can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Alive,
    BlockHeight,
    ClientVersion,
    Disconnects,
    HeadsReceived,
    TotalDifficulty,
    Latency,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        Self::Alive,
        Self::BlockHeight,
        Self::ClientVersion,
        Self::Disconnects,
        Self::HeadsReceived,
        Self::TotalDifficulty,
        Self::Latency,
    ];

    /// Kinds extracted concurrently in the worker pool. Latency is read afterwards so
    /// it reflects this cycle's queries.
    pub const POOLED: [MetricKind; 6] = [
        Self::Alive,
        Self::BlockHeight,
        Self::ClientVersion,
        Self::Disconnects,
        Self::HeadsReceived,
        Self::TotalDifficulty,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::BlockHeight => "block_height",
            Self::ClientVersion => "client_version",
            Self::Disconnects => "disconnects",
            Self::HeadsReceived => "heads_received",
            Self::TotalDifficulty => "total_difficulty",
            Self::Latency => "latency",
        }
    }
}

/// One extracted value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Flag(bool),
    Count(u64),
    Gauge(f64),
    Text(String),
    Elapsed(Duration),
}

/// Uniform, partially implemented metric surface over one endpoint.
///
/// Every metric method defaults to `None`. Implementations never return errors;
/// failures are logged where they happen.
#[async_trait]
pub trait EndpointCollector: Send + Sync {
    fn endpoint(&self) -> &Endpoint;

    /// Drops memoized replies so this cycle fetches fresh data.
    fn reset_cycle(&self);

    async fn alive(&self) -> Option<bool> {
        None
    }

    async fn block_height(&self) -> Option<u64> {
        None
    }

    async fn client_version(&self) -> Option<String> {
        None
    }

    async fn total_difficulty(&self) -> Option<f64> {
        None
    }

    fn disconnects(&self) -> Option<u64> {
        None
    }

    fn heads_received(&self) -> Option<u64> {
        None
    }

    fn latency(&self) -> Option<Duration> {
        None
    }

    /// Stops background work owned by this collector.
    fn shutdown(&self) {}

    /// Dispatches one [`MetricKind`] to the matching method.
    async fn extract(&self, kind: MetricKind) -> Option<MetricValue> {
        match kind {
            MetricKind::Alive => self.alive().await.map(MetricValue::Flag),
            MetricKind::BlockHeight => self.block_height().await.map(MetricValue::Count),
            MetricKind::ClientVersion => self.client_version().await.map(MetricValue::Text),
            MetricKind::Disconnects => self.disconnects().map(MetricValue::Count),
            MetricKind::HeadsReceived => self.heads_received().map(MetricValue::Count),
            MetricKind::TotalDifficulty => self.total_difficulty().await.map(MetricValue::Gauge),
            MetricKind::Latency => self.latency().map(MetricValue::Elapsed),
        }
    }
}
