//! Long-lived WebSocket subscriptions.
//!
//! One background task per subscribing endpoint keeps a socket open for the life of
//! the process:
//!
//! ```text
//!  Disconnected ──► Connecting ──► Subscribed ──┐
//!       ▲               │                       │ close / error / stale / ping timeout
//!       │               └── connect failure ────┤
//!       └───────────── backoff sleep ◄──────────┘
//! ```
//!
//! While subscribed the task counts every data frame, keeps the latest notification,
//! pings on a fixed cadence, and force-closes the socket (code `4000`) when no frame
//! has arrived for the idle window.

pub mod backoff;
pub mod state;

pub use backoff::ReconnectBackoff;
pub use state::{ConnectionState, SubscriptionState};

use crate::{
    config::ConnectionTimeouts,
    transport::ProbeError,
    utils::{quantity_u64, redacted_host},
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, sleep, sleep_until, timeout, Instant, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
};
use tracing::{debug, info, trace, warn};

/// Close code sent when the watchdog drops a silent subscription.
pub const STALE_CLOSE_CODE: u16 = 4000;

/// Handle to one subscription task and its shared state.
///
/// Dropping the handle cancels the task.
pub struct SubscriptionManager {
    host: String,
    state: Arc<SubscriptionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("host", &self.host)
            .field("state", &self.state.connection_state())
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    /// Spawns the subscription task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(url: impl Into<String>, subscribe: Value, timeouts: ConnectionTimeouts) -> Self {
        let url = url.into();
        let host = redacted_host(&url);
        let state = Arc::new(SubscriptionState::new());

        let task = SubscriptionTask {
            url,
            host: host.clone(),
            subscribe,
            timeouts,
            state: state.clone(),
        };
        let handle = tokio::spawn(task.run());

        Self { host, state, task: Mutex::new(Some(handle)) }
    }

    #[must_use]
    pub fn state(&self) -> &SubscriptionState {
        &self.state
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        self.state.alive()
    }

    #[must_use]
    pub fn heads_received(&self) -> u64 {
        self.state.heads_received()
    }

    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.state.disconnects()
    }

    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        self.state.latency()
    }

    /// Decodes `field` of the latest notification as a block height.
    ///
    /// Absent until the first notification arrives; a malformed value is logged and
    /// reported as absent.
    #[must_use]
    pub fn block_height(&self, field: &str) -> Option<u64> {
        let value = self.state.message_field(field)?;
        match quantity_u64(&value) {
            Ok(height) => Some(height),
            Err(e) => {
                warn!(endpoint = %self.host, field, error = %e, "failed to decode block height");
                None
            }
        }
    }

    /// Cancels the background task. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!(endpoint = %self.host, "subscription task cancelled");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PendingPing {
    nonce: u64,
    sent_at: Instant,
}

struct SubscriptionTask {
    url: String,
    host: String,
    subscribe: Value,
    timeouts: ConnectionTimeouts,
    state: Arc<SubscriptionState>,
}

impl SubscriptionTask {
    async fn run(self) {
        let mut backoff =
            ReconnectBackoff::new(self.timeouts.reconnect_initial, self.timeouts.reconnect_max);

        loop {
            self.state.mark_connecting();

            match self.session().await {
                Ok(reason) => info!(endpoint = %self.host, reason, "subscription closed"),
                Err(e) => warn!(endpoint = %self.host, error = %e, "subscription failed"),
            }

            if self.state.mark_closed() {
                backoff.record_success();
                warn!(
                    endpoint = %self.host,
                    disconnects = self.state.disconnects(),
                    "subscription lost"
                );
            }

            let delay = backoff.next_delay();
            debug!(
                endpoint = %self.host,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = backoff.consecutive_failures(),
                "reconnecting"
            );
            sleep(delay).await;
        }
    }

    /// Runs one connection until it ends, returning why it ended.
    async fn session(&self) -> Result<&'static str, ProbeError> {
        let (stream, _) = timeout(self.timeouts.open, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(|e| ProbeError::from_ws(&e))?;
        let (mut write, mut read) = stream.split();

        self.state.mark_subscribed();
        info!(endpoint = %self.host, "subscription connected");

        let subscribe = Message::Text(self.subscribe.to_string().into());
        timeout(self.timeouts.response, write.send(subscribe))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(|e| ProbeError::from_ws(&e))?;

        let start = Instant::now();
        let mut ping_tick =
            interval_at(start + self.timeouts.ping_interval, self.timeouts.ping_interval);
        ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_frame_at = start;
        let mut pending_ping: Option<PendingPing> = None;
        let mut nonce: u64 = 0;

        let outcome = loop {
            let idle_deadline = last_frame_at + self.timeouts.idle;
            let pong_deadline =
                pending_ping.as_ref().map(|p| p.sent_at + self.timeouts.ping_timeout);

            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        trace!(endpoint = %self.host, "subscription frame");
                        self.state.record_message(text.as_bytes());
                        last_frame_at = Instant::now();
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        self.state.record_message(&bytes);
                        last_frame_at = Instant::now();
                    }
                    Some(Ok(Message::Pong(payload))) => {
                        let matches = |p: &mut PendingPing| payload[..] == p.nonce.to_be_bytes()[..];
                        if let Some(ping) = pending_ping.take_if(matches) {
                            self.state.record_ping_latency(ping.sent_at.elapsed());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(endpoint = %self.host, frame = ?frame, "peer closed subscription");
                        break Ok("closed by peer");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(ProbeError::from_ws(&e)),
                    None => break Ok("stream ended"),
                },
                _ = ping_tick.tick(), if pending_ping.is_none() => {
                    nonce = nonce.wrapping_add(1);
                    let payload = Bytes::copy_from_slice(&nonce.to_be_bytes());
                    if let Err(e) = write.send(Message::Ping(payload)).await {
                        break Err(ProbeError::from_ws(&e));
                    }
                    pending_ping = Some(PendingPing { nonce, sent_at: Instant::now() });
                }
                () = sleep_until(pong_deadline.unwrap_or(idle_deadline)), if pong_deadline.is_some() => {
                    break Err(ProbeError::Timeout);
                }
                () = sleep_until(idle_deadline) => {
                    let reason = stale_reason(self.timeouts.idle);
                    warn!(
                        endpoint = %self.host,
                        heads_received = self.state.heads_received(),
                        "{reason}"
                    );
                    let frame = CloseFrame {
                        code: CloseCode::from(STALE_CLOSE_CODE),
                        reason: reason.into(),
                    };
                    let _ = timeout(self.timeouts.close, write.send(Message::Close(Some(frame)))).await;
                    break Ok("stale");
                }
            }
        };

        let _ = timeout(self.timeouts.close, write.close()).await;
        outcome
    }
}

/// Diagnostic sent in the watchdog's close frame.
#[must_use]
pub fn stale_reason(idle: Duration) -> String {
    format!("No new messages within {} seconds", idle.as_secs())
}
