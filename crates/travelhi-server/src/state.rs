//! Shared application state for the API server.
//!
//! [`AppState`] is built once at startup and shared by every handler behind
//! an `Arc`. Stores are trait objects so the same handlers run against
//! `PostgreSQL` in production and the in-memory store in tests.

use std::sync::Arc;
use std::time::Duration;

use travelhi_ai::{AiError, DisruptionPredictor, Moderator, ProfanityFilter};
use travelhi_core::{EventStore, InMemoryStore, ReportStore};

use crate::images::{ImageStore, photo_url};
use crate::registry::ConnectionRegistry;

/// Per-session send deadline used when none is configured.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a request handler can reach.
pub struct AppState {
    /// Report persistence.
    pub reports: Arc<dyn ReportStore>,
    /// Event persistence.
    pub events: Arc<dyn EventStore>,
    /// Live `WebSocket` sessions.
    pub registry: Arc<ConnectionRegistry>,
    /// Uploaded photo storage.
    pub images: ImageStore,
    /// Text moderation for user-supplied fields.
    pub moderator: Arc<Moderator>,
    /// Disruption predictor; `None` when no LLM backend is configured.
    pub predictor: Option<Arc<DisruptionPredictor>>,
    /// Externally visible origin used in photo URLs.
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Assemble state from its parts. No predictor, no public base URL.
    pub const fn new(
        reports: Arc<dyn ReportStore>,
        events: Arc<dyn EventStore>,
        registry: Arc<ConnectionRegistry>,
        images: ImageStore,
        moderator: Arc<Moderator>,
    ) -> Self {
        Self {
            reports,
            events,
            registry,
            images,
            moderator,
            predictor: None,
            public_base_url: None,
        }
    }

    /// State backed by a fresh [`InMemoryStore`] and the profanity filter
    /// alone. Used by tests and `storage.backend: memory`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Pattern`] if the profanity patterns fail to
    /// compile.
    pub fn in_memory(images: ImageStore, send_timeout: Duration) -> Result<Self, AiError> {
        let store = Arc::new(InMemoryStore::new());
        let moderator = Moderator::new(ProfanityFilter::new()?);
        Ok(Self::new(
            Arc::clone(&store) as Arc<dyn ReportStore>,
            store,
            Arc::new(ConnectionRegistry::new(send_timeout)),
            images,
            Arc::new(moderator),
        ))
    }

    /// Attach a disruption predictor.
    #[must_use]
    pub fn with_predictor(mut self, predictor: Arc<DisruptionPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Set the public origin used in photo URLs.
    #[must_use]
    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.filter(|b| !b.trim().is_empty());
        self
    }

    /// Photo URL for a stored file name.
    ///
    /// Uses the configured public base URL, falling back to the request's
    /// `Host` header and finally to `localhost`.
    pub fn photo_url(&self, host: Option<&str>, name: &str) -> String {
        match (&self.public_base_url, host) {
            (Some(base), _) => photo_url(base, name),
            (None, Some(host)) => photo_url(&format!("http://{host}"), name),
            (None, None) => photo_url("http://localhost", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::in_memory(ImageStore::new("uploads", 1024), DEFAULT_SEND_TIMEOUT)
            .unwrap_or_else(|e| panic!("state: {e}"))
    }

    #[test]
    fn photo_url_prefers_configured_base() {
        let state = state().with_public_base_url(Some(String::from("https://cdn.example.com/")));
        assert_eq!(
            state.photo_url(Some("api.local:8000"), "a.png"),
            "https://cdn.example.com/files/a.png"
        );
    }

    #[test]
    fn photo_url_falls_back_to_host_header() {
        let state = state();
        assert_eq!(
            state.photo_url(Some("api.local:8000"), "a.png"),
            "http://api.local:8000/files/a.png"
        );
        assert_eq!(state.photo_url(None, "a.png"), "http://localhost/files/a.png");
    }

    #[test]
    fn blank_base_url_is_ignored() {
        let state = state().with_public_base_url(Some(String::from("  ")));
        assert!(state.public_base_url.is_none());
    }
}
