//! Scheduled event endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use travelhi_core::events::{
    DEFAULT_AROUND_LIMIT, DEFAULT_DAY_LIMIT, DEFAULT_THRESHOLD_HOURS, MAX_EVENT_LIMIT,
    create_event, list_events,
};
use travelhi_core::{EventFilter, Page, events_around, events_on_day};
use travelhi_types::{Event, EventSeverity, EventType, NewEvent};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /api/v1/events/by-day`.
#[derive(Debug, Default, Deserialize)]
pub struct DayParams {
    /// The UTC day, `YYYY-MM-DD` (required).
    pub day: Option<NaiveDate>,
    /// Only events of this type.
    pub event_type: Option<String>,
    /// Only events of this severity (`1`, `2`, `3`).
    pub severity: Option<u8>,
    /// Only verified or only unverified events.
    pub is_verified: Option<bool>,
    /// Page size, 1 to 1000 (default 500).
    pub limit: Option<u32>,
    /// Number of events to skip (default 0).
    pub offset: Option<u64>,
}

/// Query parameters for `GET /api/v1/events/around`.
#[derive(Debug, Default, Deserialize)]
pub struct AroundParams {
    /// Reference moment, ISO-8601 (required).
    pub at: Option<DateTime<Utc>>,
    /// Half-width of the window in hours, 1 to 24 (default 3).
    pub threshold_hours: Option<u32>,
    /// Only events of this type.
    pub event_type: Option<String>,
    /// Only events of this severity (`1`, `2`, `3`).
    pub severity: Option<u8>,
    /// Only verified or only unverified events.
    pub is_verified: Option<bool>,
    /// Page size, 1 to 1000 (default 200).
    pub limit: Option<u32>,
    /// Number of events to skip (default 0).
    pub offset: Option<u64>,
}

fn event_filter(
    event_type: Option<&str>,
    severity: Option<u8>,
    is_verified: Option<bool>,
) -> Result<EventFilter, ApiError> {
    Ok(EventFilter {
        event_type: event_type.map(str::parse::<EventType>).transpose()?,
        severity: severity.map(EventSeverity::try_from).transpose()?,
        is_verified,
    })
}

/// Create a scheduled event.
///
/// # Route
///
/// `POST /api/v1/events`
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(event) = payload?;
    let stored = create_event(state.events.as_ref(), event).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Every event ordered by start time.
///
/// # Route
///
/// `GET /api/v1/events`
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(list_events(state.events.as_ref()).await?))
}

/// Events overlapping one UTC day.
///
/// # Route
///
/// `GET /api/v1/events/by-day?day=YYYY-MM-DD`
pub async fn by_day(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DayParams>, QueryRejection>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let Query(params) = params?;
    let day = params
        .day
        .ok_or_else(|| ApiError::BadRequest(String::from("day query parameter is required")))?;
    let filter = event_filter(
        params.event_type.as_deref(),
        params.severity,
        params.is_verified,
    )?;
    let page = Page::with_ceiling(
        params.offset.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_DAY_LIMIT),
        MAX_EVENT_LIMIT,
    )?;

    Ok(Json(events_on_day(state.events.as_ref(), day, filter, page).await?))
}

/// Events overlapping `[at - threshold_hours, at + threshold_hours]`.
///
/// # Route
///
/// `GET /api/v1/events/around?at=2025-10-04T12:00:00Z`
pub async fn around(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AroundParams>, QueryRejection>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let Query(params) = params?;
    let at = params
        .at
        .ok_or_else(|| ApiError::BadRequest(String::from("at query parameter is required")))?;
    let filter = event_filter(
        params.event_type.as_deref(),
        params.severity,
        params.is_verified,
    )?;
    let page = Page::with_ceiling(
        params.offset.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_AROUND_LIMIT),
        MAX_EVENT_LIMIT,
    )?;
    let hours = params.threshold_hours.unwrap_or(DEFAULT_THRESHOLD_HOURS);

    Ok(Json(
        events_around(state.events.as_ref(), at, hours, filter, page).await?,
    ))
}
