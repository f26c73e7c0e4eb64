//! Live `WebSocket` session registry and broadcast fan-out.
//!
//! The registry owns the set of open sessions. A broadcast snapshots the
//! set under a read lock, releases the lock, and then delivers to every
//! session concurrently with a per-session deadline. Sessions whose send
//! fails or times out are evicted and told to close; nothing is retried.
//! No lock is held while a send is in flight, so a slow client delays
//! nobody but itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifier of one live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// A fresh, time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A send to a session failed.
#[derive(Debug, thiserror::Error)]
#[error("session send failed: {0}")]
pub struct SendError(pub String);

/// One connected client.
#[async_trait]
pub trait Session: Send + Sync {
    /// Deliver one text frame.
    async fn send_text(&self, text: &str) -> Result<(), SendError>;

    /// Ask the connection behind this session to shut down. Called once
    /// the session has been evicted; it will never be sent to again.
    fn close(&self);
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Sessions that received the message.
    pub delivered: usize,
    /// Sessions removed because their send failed or timed out.
    pub evicted: usize,
}

/// The set of live sessions.
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<dyn Session>>>,
    send_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create an empty registry with a per-session send deadline.
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    /// Add a session to the live set and return its id.
    pub async fn register(&self, session: Arc<dyn Session>) -> SessionId {
        let id = SessionId::new();
        let live = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id, session);
            sessions.len()
        };
        tracing::debug!(session = %id, live, "Session registered");
        id
    }

    /// Remove a session. Returns whether it was present; calling this for
    /// an unknown or already removed id is a no-op.
    pub async fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session = %id, "Session unregistered");
        }
        removed
    }

    /// Per-session send deadline.
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Deliver a text message to every live session.
    ///
    /// Afterwards every session that was live when the snapshot was taken
    /// has either received the message or been removed.
    pub async fn broadcast(&self, message: &str) -> BroadcastOutcome {
        let snapshot: Vec<(SessionId, Arc<dyn Session>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect();

        if snapshot.is_empty() {
            return BroadcastOutcome::default();
        }

        let deadline = self.send_timeout;
        let sends = snapshot.iter().map(|(id, session)| async move {
            match tokio::time::timeout(deadline, session.send_text(message)).await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => {
                    tracing::debug!(session = %id, error = %e, "Send failed, evicting");
                    Some(*id)
                }
                Err(_) => {
                    tracing::debug!(session = %id, ?deadline, "Send timed out, evicting");
                    Some(*id)
                }
            }
        });
        let failed: Vec<SessionId> = join_all(sends).await.into_iter().flatten().collect();

        let removed: Vec<Arc<dyn Session>> = if failed.is_empty() {
            Vec::new()
        } else {
            let mut sessions = self.sessions.write().await;
            failed.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &removed {
            session.close();
        }

        let outcome = BroadcastOutcome {
            delivered: snapshot.len().saturating_sub(failed.len()),
            evicted: removed.len(),
        };
        tracing::debug!(
            delivered = outcome.delivered,
            evicted = outcome.evicted,
            "Broadcast complete"
        );
        outcome
    }

    /// Serialize a value once and broadcast it. Serialization failures are
    /// logged and deliver nothing.
    pub async fn broadcast_json<T: Serialize + Sync>(&self, value: &T) -> BroadcastOutcome {
        match serde_json::to_string(value) {
            Ok(text) => self.broadcast(&text).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize broadcast message");
                BroadcastOutcome::default()
            }
        }
    }
}
