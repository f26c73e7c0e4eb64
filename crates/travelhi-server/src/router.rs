//! Axum router construction for the Travel Hi API.
//!
//! Assembles all routes (REST, `WebSocket`, uploaded files) into a single
//! [`Router`] with permissive CORS for the web and mobile clients.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, disruptions, events, reports};
use crate::state::AppState;
use crate::ws;

/// Room left in the create-report body for the non-photo form fields.
const FORM_OVERHEAD_BYTES: usize = 65_536;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `/api/v1/incidents` -- report creation, listing, proximity search, reactions
/// - `GET /api/v1/ws` -- live report feed
/// - `/api/v1/events` -- scheduled events
/// - `POST /api/v1/disruptions/predict` -- disruption estimates
/// - `GET /files/{name}` -- uploaded photos
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.images.max_bytes().saturating_add(FORM_OVERHEAD_BYTES);
    let files = ServeDir::new(state.images.dir());

    Router::new()
        .route("/health", get(handlers::health))
        // Incidents
        .route(
            "/api/v1/incidents",
            post(reports::create_incident)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(reports::list_incidents),
        )
        .route("/api/v1/incidents/nearby", get(reports::nearby_incidents))
        .route("/api/v1/incidents/{id}", get(reports::get_incident))
        .route("/api/v1/incidents/{id}/like", post(reports::like_incident))
        .route("/api/v1/incidents/{id}/confirm", post(reports::confirm_incident))
        .route("/api/v1/incidents/{id}/deny", post(reports::deny_incident))
        // WebSocket
        .route("/api/v1/ws", get(ws::ws_feed))
        // Events
        .route("/api/v1/events", post(events::create).get(events::list))
        .route("/api/v1/events/by-day", get(events::by_day))
        .route("/api/v1/events/around", get(events::around))
        // Disruptions
        .route("/api/v1/disruptions/predict", post(disruptions::predict))
        // Uploaded photos
        .nest_service("/files", files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
