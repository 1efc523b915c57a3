use parking_lot::RwLock;
use serde_json::Value;
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

/// Position of a subscription in its connect/subscribe/reconnect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Live view of one subscription.
///
/// Only the subscription task writes; collectors read concurrently during a scrape.
#[derive(Debug)]
pub struct SubscriptionState {
    connection: RwLock<ConnectionState>,
    healthy: AtomicBool,
    disconnects: AtomicU64,
    heads_received: AtomicU64,
    latest_message: RwLock<Option<Value>>,
    latest_ping_latency: RwLock<Option<Duration>>,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            connection: RwLock::new(ConnectionState::Disconnected),
            healthy: AtomicBool::new(false),
            disconnects: AtomicU64::new(0),
            heads_received: AtomicU64::new(0),
            latest_message: RwLock::new(None),
            latest_ping_latency: RwLock::new(None),
        }
    }
}

impl SubscriptionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.read()
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn heads_received(&self) -> u64 {
        self.heads_received.load(Ordering::Acquire)
    }

    /// Last subscription notification payload (`params.result`).
    #[must_use]
    pub fn latest_message(&self) -> Option<Value> {
        self.latest_message.read().clone()
    }

    /// One field of the last notification.
    #[must_use]
    pub fn message_field(&self, field: &str) -> Option<Value> {
        self.latest_message.read().as_ref().and_then(|m| m.get(field).cloned())
    }

    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        *self.latest_ping_latency.read()
    }

    pub(crate) fn mark_connecting(&self) {
        *self.connection.write() = ConnectionState::Connecting;
    }

    pub(crate) fn mark_subscribed(&self) {
        *self.connection.write() = ConnectionState::Subscribed;
        self.healthy.store(true, Ordering::Release);
    }

    /// Records the end of a connection attempt or session.
    ///
    /// Returns `true` if this closed a healthy subscription, which is the only case
    /// that counts as a disconnect.
    pub(crate) fn mark_closed(&self) -> bool {
        let was_healthy = self.healthy.swap(false, Ordering::AcqRel);
        if was_healthy {
            self.disconnects.fetch_add(1, Ordering::AcqRel);
        }
        *self.connection.write() = ConnectionState::Disconnected;
        was_healthy
    }

    /// Counts one inbound data frame and keeps its notification payload, if any.
    pub(crate) fn record_message(&self, frame: &[u8]) {
        self.heads_received.fetch_add(1, Ordering::AcqRel);

        let Ok(mut message) = serde_json::from_slice::<Value>(frame) else {
            tracing::trace!("ignoring non-JSON subscription frame");
            return;
        };
        if let Some(result) = message.pointer_mut("/params/result").map(Value::take) {
            *self.latest_message.write() = Some(result);
        }
    }

    pub(crate) fn record_ping_latency(&self, rtt: Duration) {
        *self.latest_ping_latency.write() = Some(rtt);
    }
}
