//! Mock WebSocket Server for Testing
//!
//! Provides a configurable WebSocket node for subscription and short-query tests
//! without requiring a real blockchain node.

use super::test_helpers::new_heads_notification;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::RwLock,
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Default)]
struct Shared {
    message_queue: RwLock<VecDeque<Message>>,
    received_messages: RwLock<Vec<String>>,
    replies: RwLock<HashMap<String, Value>>,
    close_frames: RwLock<Vec<(u16, String)>>,
    connections: AtomicUsize,
    muted_connections: AtomicUsize,
}

/// A mock WebSocket node for testing.
///
/// Queued messages go to whichever connection drains the queue first. Requests
/// whose `method` has a registered reply are answered on the same connection.
pub struct MockWebSocketServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    server_handle: JoinHandle<()>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl MockWebSocketServer {
    /// Creates a new mock WebSocket server on a random available port.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to a local port or retrieve the bound address.
    pub async fn new() -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared::default());
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        let server_handle = Self::spawn_server(listener, shared.clone(), shutdown_tx.subscribe());

        Ok(Self { addr, shared, server_handle, shutdown_tx })
    }

    fn spawn_server(
        listener: TcpListener,
        shared: Arc<Shared>,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        if let Ok((stream, _)) = result {
                            tokio::spawn(Self::handle_connection(stream, shared.clone()));
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        })
    }

    async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) {
        let Ok(ws_stream) = accept_async(stream).await else { return };
        shared.connections.fetch_add(1, Ordering::SeqCst);
        let muted = shared
            .muted_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let (mut write, mut read) = ws_stream.split();

        loop {
            // Send any queued messages
            {
                let mut queue = shared.message_queue.write().await;
                while let Some(msg) = queue.pop_front() {
                    let closing = matches!(msg, Message::Close(_));
                    if write.send(msg).await.is_err() || closing {
                        return;
                    }
                }
            }

            // Process incoming messages with timeout
            tokio::select! {
                Some(result) = read.next() => {
                    match result {
                        Ok(Message::Text(text)) => {
                            let text = text.to_string();
                            if let Some(reply) = Self::reply_for(&shared, &text).await {
                                if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                                    return;
                                }
                            }
                            shared.received_messages.write().await.push(text);
                            if muted {
                                // Stop polling the socket so pings go unanswered
                                tokio::time::sleep(Duration::from_secs(30)).await;
                                return;
                            }
                        }
                        Ok(Message::Close(frame)) => {
                            if let Some(frame) = frame {
                                let entry = (u16::from(frame.code), frame.reason.as_str().to_string());
                                shared.close_frames.write().await.push(entry);
                            }
                            break;
                        }
                        Err(_) => {
                            break;
                        }
                        _ => ()
                    }
                }
                () = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }
    }

    async fn reply_for(shared: &Shared, text: &str) -> Option<Value> {
        let request: Value = serde_json::from_str(text).ok()?;
        let method = request.get("method")?.as_str()?;
        let result = shared.replies.read().await.get(method)?.clone();
        Some(json!({
            "jsonrpc": "2.0",
            "id": request.get("id").cloned().unwrap_or(Value::Null),
            "result": result
        }))
    }

    /// Returns the WebSocket URL for connecting to this server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Answers every request for `method` with `result`.
    pub async fn reply_to(&self, method: &str, result: Value) {
        self.shared.replies.write().await.insert(method.to_string(), result);
    }

    /// Number of WebSocket handshakes accepted so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Stops reading the next connection after its first request, so it never
    /// answers pings.
    pub fn ignore_pings_on_next_connection(&self) {
        self.shared.muted_connections.fetch_add(1, Ordering::SeqCst);
    }

    /// Enqueues a message to be sent to connected clients.
    pub async fn enqueue_message(&self, msg: Message) {
        self.shared.message_queue.write().await.push_back(msg);
    }

    /// Enqueues a text message to be sent to connected clients.
    pub async fn enqueue_text(&self, text: impl Into<String>) {
        self.enqueue_message(Message::Text(text.into().into())).await;
    }

    /// Sends a `newHeads` notification.
    pub async fn send_new_heads(&self, block_number: u64) {
        self.enqueue_text(new_heads_notification(block_number).to_string()).await;
    }

    /// Sends a close frame and drops the connection that receives it.
    pub async fn send_close(&self) {
        self.enqueue_message(Message::Close(None)).await;
    }

    /// Waits until `count` subscription requests have been received.
    pub async fn wait_for_subscriptions(&self, count: usize, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.subscription_count().await >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    async fn subscription_count(&self) -> usize {
        let received = self.shared.received_messages.read().await;
        received.iter().filter(|msg| msg.contains("_subscribe")).count()
    }

    /// Close frames sent by clients, as `(code, reason)`.
    pub async fn get_close_frames(&self) -> Vec<(u16, String)> {
        self.shared.close_frames.read().await.clone()
    }

    /// Returns all received messages.
    pub async fn get_received_messages(&self) -> Vec<String> {
        self.shared.received_messages.read().await.clone()
    }

    /// Shuts down the server.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.server_handle.abort();
    }
}

impl Drop for MockWebSocketServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        self.server_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[tokio::test]
    async fn test_mock_websocket_server_creation() {
        let server = MockWebSocketServer::new().await.unwrap();
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_websocket_new_heads() {
        let server = MockWebSocketServer::new().await.unwrap();
        server.send_new_heads(1000).await;

        let (mut ws_stream, _) = connect_async(&server.url()).await.expect("Failed to connect");

        let frame = tokio::time::timeout(Duration::from_secs(2), ws_stream.next()).await.unwrap();
        let Some(Ok(Message::Text(text))) = frame else {
            panic!("expected a text frame");
        };
        assert!(text.contains("eth_subscription"));
        assert!(text.contains("0x3e8")); // 1000 in hex
    }

    #[tokio::test]
    async fn test_mock_websocket_replies_by_method() {
        let server = MockWebSocketServer::new().await.unwrap();
        server.reply_to("web3_clientVersion", json!("Geth/v1.13.5")).await;

        let (mut ws_stream, _) = connect_async(&server.url()).await.expect("Failed to connect");
        let request = json!({"jsonrpc": "2.0", "id": 7, "method": "web3_clientVersion", "params": []});
        ws_stream.send(Message::Text(request.to_string().into())).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), ws_stream.next()).await.unwrap();
        let Some(Ok(Message::Text(text))) = frame else {
            panic!("expected a text frame");
        };
        let reply: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["result"], "Geth/v1.13.5");
        assert_eq!(server.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_websocket_receives_client_messages() {
        let server = MockWebSocketServer::new().await.unwrap();

        let (mut ws_stream, _) = connect_async(&server.url()).await.expect("Failed to connect");
        let sub_request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["newHeads"]
        });
        ws_stream.send(Message::Text(sub_request.to_string().into())).await.unwrap();

        assert!(server.wait_for_subscriptions(1, Duration::from_secs(2)).await);
    }
}
