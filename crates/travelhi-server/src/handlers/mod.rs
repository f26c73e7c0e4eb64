//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `POST` | `/api/v1/incidents` | Create a report (multipart) |
//! | `GET` | `/api/v1/incidents` | List reports, newest first |
//! | `GET` | `/api/v1/incidents/nearby` | Reports within a radius |
//! | `GET` | `/api/v1/incidents/{id}` | Single report |
//! | `POST` | `/api/v1/incidents/{id}/like` | Add a like |
//! | `POST` | `/api/v1/incidents/{id}/confirm` | Add a confirmation |
//! | `POST` | `/api/v1/incidents/{id}/deny` | Add a denial |
//! | `POST` | `/api/v1/events` | Create a scheduled event |
//! | `GET` | `/api/v1/events` | List all events |
//! | `GET` | `/api/v1/events/by-day` | Events overlapping a UTC day |
//! | `GET` | `/api/v1/events/around` | Events around a moment |
//! | `POST` | `/api/v1/disruptions/predict` | Disruption estimate for a transit report |

pub mod disruptions;
pub mod events;
pub mod reports;

use std::convert::Infallible;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::IntoResponse;

/// The request's `Host` header, used to build absolute photo URLs when no
/// public base URL is configured.
#[derive(Debug, Clone, Default)]
pub struct RequestHost(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for RequestHost {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(Self(host))
    }
}

/// Liveness probe.
///
/// # Route
///
/// `GET /health`
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
