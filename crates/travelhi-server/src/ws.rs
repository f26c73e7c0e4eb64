//! `WebSocket` handler for the live incident feed.
//!
//! Clients connect to `GET /api/v1/ws`. Each connection is registered with
//! the [`ConnectionRegistry`](crate::registry::ConnectionRegistry) as a
//! session and receives every report broadcast. On connect the client gets
//! a welcome frame; short text it sends is echoed to every live session.
//! The connection ends when the client closes, the stream fails, a control
//! send misses the registry deadline, or the registry evicts the session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, StreamExt};
use futures::{Sink, SinkExt};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::{SendError, Session, SessionId};
use crate::state::AppState;

/// Largest message a client may send; anything bigger drops the connection.
pub const MAX_CLIENT_MESSAGE_BYTES: usize = 16_384;

/// Longest client text relayed to the other sessions.
pub const MAX_ECHO_BYTES: usize = 1_024;

/// Control frame sent by the server outside the report stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedFrame {
    /// Sent once, right after the upgrade.
    Welcome {
        /// Greeting text.
        message: String,
    },
    /// Client text relayed to every session.
    Echo {
        /// The relayed text.
        message: String,
    },
}

/// Echo for a client text frame, or `None` when it is too long to relay.
pub fn echo_frame(text: &str) -> Option<FeedFrame> {
    (text.len() <= MAX_ECHO_BYTES).then(|| FeedFrame::Echo {
        message: text.to_owned(),
    })
}

/// The write half of one `WebSocket` connection.
///
/// `close` raises a hang-up signal that the connection task waits on, so
/// an evicted client is disconnected instead of lingering without reports.
pub struct WsSession<S = SplitSink<WebSocket, Message>> {
    sink: Mutex<S>,
    hangup: Notify,
}

impl<S> WsSession<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: fmt::Display,
{
    /// Wrap the write half of a connection.
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
            hangup: Notify::new(),
        }
    }

    async fn send(&self, message: Message) -> Result<(), SendError> {
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| SendError(e.to_string()))
    }

    /// Send a frame, giving up after `deadline`.
    async fn send_within(&self, message: Message, deadline: Duration) -> Result<(), SendError> {
        tokio::time::timeout(deadline, self.send(message))
            .await
            .map_err(|elapsed| SendError(format!("no progress after {deadline:?}: {elapsed}")))?
    }

    /// Resolves once the registry has closed this session.
    pub async fn hung_up(&self) {
        self.hangup.notified().await;
    }
}

#[async_trait]
impl<S> Session for WsSession<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: fmt::Display,
{
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.send(Message::Text(text.into())).await
    }

    fn close(&self) {
        self.hangup.notify_one();
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection and join the feed.
///
/// # Route
///
/// `GET /api/v1/ws`
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_CLIENT_MESSAGE_BYTES)
        .max_frame_size(MAX_CLIENT_MESSAGE_BYTES)
        .on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register, greet, relay, unregister.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let session = Arc::new(WsSession::new(sink));
    let id = state.registry.register(Arc::clone(&session) as Arc<dyn Session>).await;
    let deadline = state.registry.send_timeout();
    debug!(session = %id, "WebSocket client connected");

    let welcome = FeedFrame::Welcome {
        message: String::from("connected"),
    };
    match serde_json::to_string(&welcome) {
        Ok(text) => {
            if let Err(e) = session.send_within(Message::Text(text.into()), deadline).await {
                debug!(session = %id, error = %e, "Welcome not delivered, dropping client");
                state.registry.unregister(id).await;
                return;
            }
        }
        Err(e) => warn!("Failed to serialize welcome frame: {e}"),
    }

    let mut echo: Option<JoinHandle<()>> = None;
    loop {
        let next = tokio::select! {
            () = session.hung_up() => {
                debug!(session = %id, "Session evicted, closing WebSocket");
                break;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => relay(&state, id, text.as_str(), &mut echo),
            Some(Ok(Message::Ping(data))) => {
                if let Err(e) = session.send_within(Message::Pong(data), deadline).await {
                    debug!(session = %id, error = %e, "Pong not delivered, dropping client");
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!(session = %id, "WebSocket client disconnected");
                break;
            }
            Some(Err(e)) => {
                debug!(session = %id, "WebSocket error: {e}");
                break;
            }
            Some(Ok(_)) => {
                // Binary and pong frames carry nothing for the feed.
            }
        }
    }

    state.registry.unregister(id).await;
}

/// Echo client text to every session. At most one echo per client is in
/// flight; frames arriving meanwhile are dropped.
fn relay(state: &AppState, id: SessionId, text: &str, echo: &mut Option<JoinHandle<()>>) {
    if echo.as_ref().is_some_and(|task| !task.is_finished()) {
        debug!(session = %id, "Echo still in flight, dropping frame");
        return;
    }
    let Some(frame) = echo_frame(text) else {
        debug!(session = %id, bytes = text.len(), "Client text too long to echo");
        return;
    };
    let registry = Arc::clone(&state.registry);
    *echo = Some(tokio::spawn(async move {
        registry.broadcast_json(&frame).await;
    }));
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc;

    use super::*;
    use crate::registry::{BroadcastOutcome, ConnectionRegistry};

    type ChannelSession = WsSession<mpsc::Sender<Message>>;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Duration::from_millis(50))
    }

    async fn hangs_up_soon(session: &ChannelSession) -> bool {
        tokio::time::timeout(Duration::from_millis(200), session.hung_up())
            .await
            .is_ok()
    }

    #[test]
    fn welcome_frame_is_tagged() {
        let frame = FeedFrame::Welcome {
            message: String::from("connected"),
        };
        assert_eq!(
            serde_json::to_value(&frame).ok(),
            Some(serde_json::json!({"type": "welcome", "message": "connected"}))
        );
    }

    #[test]
    fn echo_frame_carries_client_text() {
        assert_eq!(
            echo_frame("hi").and_then(|f| serde_json::to_value(&f).ok()),
            Some(serde_json::json!({"type": "echo", "message": "hi"}))
        );
    }

    #[test]
    fn overlong_text_is_not_echoed() {
        assert!(echo_frame(&"a".repeat(MAX_ECHO_BYTES)).is_some());
        assert!(echo_frame(&"a".repeat(MAX_ECHO_BYTES.saturating_add(1))).is_none());
    }

    #[tokio::test]
    async fn delivered_session_stays_connected() {
        let registry = registry();
        let (tx, mut rx) = mpsc::channel(4);
        let session = Arc::new(WsSession::new(tx));
        registry.register(Arc::clone(&session) as Arc<dyn Session>).await;

        let outcome = registry.broadcast("report").await;

        assert_eq!(outcome, BroadcastOutcome { delivered: 1, evicted: 0 });
        assert_eq!(rx.next().await, Some(Message::Text("report".into())));
        assert!(!hangs_up_soon(&session).await);
    }

    #[tokio::test]
    async fn closed_socket_is_evicted_and_hung_up() {
        let registry = registry();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let session = Arc::new(WsSession::new(tx));
        registry.register(Arc::clone(&session) as Arc<dyn Session>).await;

        let outcome = registry.broadcast("report").await;

        assert_eq!(outcome.evicted, 1);
        assert!(hangs_up_soon(&session).await);
    }

    #[tokio::test]
    async fn stalled_socket_is_evicted_and_hung_up() {
        let registry = registry();
        // Capacity 0 leaves one slot per sender; fill it so the next send stalls.
        let (mut tx, _rx) = mpsc::channel(0);
        tx.send(Message::Text("unread".into()))
            .await
            .unwrap_or_else(|e| panic!("first send: {e}"));
        let session = Arc::new(WsSession::new(tx));
        registry.register(Arc::clone(&session) as Arc<dyn Session>).await;

        let outcome = registry.broadcast("report").await;

        assert_eq!(outcome.evicted, 1);
        assert!(registry.is_empty().await);
        assert!(hangs_up_soon(&session).await);
    }

    #[tokio::test]
    async fn control_send_gives_up_at_the_deadline() {
        let (mut tx, _rx) = mpsc::channel(0);
        tx.send(Message::Text("unread".into()))
            .await
            .unwrap_or_else(|e| panic!("first send: {e}"));
        let session = WsSession::new(tx);

        let result = session
            .send_within(Message::Pong(Vec::new().into()), Duration::from_millis(20))
            .await;

        assert!(result.is_err());
    }
}
