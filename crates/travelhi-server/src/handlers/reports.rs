//! Incident report endpoints.
//!
//! Creating a report validates and moderates every field before any side
//! effect, stores the photo, commits the report, and only then spawns the
//! broadcast. The response never waits on the broadcast.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use travelhi_core::query::DEFAULT_RADIUS_KM;
use travelhi_core::reports::{create_report, get_report, list_reports, react};
use travelhi_core::{DEFAULT_PAGE_LIMIT, NearbyQuery, Page, Paginated, query_nearby};
use travelhi_types::{
    Coordinates, NewReport, ReactionCounter, Report, ReportBroadcast, ReportCategory, ReportId,
};

use super::RequestHost;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response and query types
// ---------------------------------------------------------------------------

/// A report as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    /// Report id.
    pub id: ReportId,
    /// Report category.
    #[serde(rename = "type")]
    pub category: ReportCategory,
    /// Optional short title.
    pub name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Where the incident is.
    pub location: Coordinates,
    /// Absolute URL of the photo, if one was uploaded.
    pub photo_url: Option<String>,
    /// Number of likes.
    pub likes: u32,
    /// Number of confirmations.
    pub confirmations: u32,
    /// Number of denials.
    pub denials: u32,
    /// When the report was stored.
    pub created_at: DateTime<Utc>,
}

impl ReportResponse {
    /// Project a stored report, resolving its photo to a public URL.
    pub fn new(report: Report, state: &AppState, host: Option<&str>) -> Self {
        Self {
            id: report.id,
            category: report.category,
            photo_url: report.photo.as_deref().map(|name| state.photo_url(host, name)),
            name: report.name,
            description: report.description,
            location: report.location,
            likes: report.likes,
            confirmations: report.confirmations,
            denials: report.denials,
            created_at: report.created_at,
        }
    }
}

/// Query parameters for `GET /api/v1/incidents`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Number of reports to skip (default 0).
    pub skip: Option<u64>,
    /// Page size (default 50, at most 200).
    pub limit: Option<u32>,
}

/// Query parameters for `GET /api/v1/incidents/nearby`.
#[derive(Debug, Default, Deserialize)]
pub struct NearbyParams {
    /// Center latitude.
    pub lat: Option<f64>,
    /// Center longitude.
    pub lng: Option<f64>,
    /// Search radius in kilometres (default 1).
    pub radius_km: Option<f64>,
    /// Number of matches to skip (default 0).
    pub skip: Option<u64>,
    /// Page size (default 50, at most 200).
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Multipart form
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct UploadedPhoto {
    content_type: Option<String>,
    bytes: Bytes,
}

/// The raw fields of a create-report form.
#[derive(Debug, Default)]
struct IncidentForm {
    category: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    name: Option<String>,
    description: Option<String>,
    photo: Option<UploadedPhoto>,
}

impl IncidentForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "type" => form.category = Some(field.text().await?),
                "lat" => form.lat = Some(field.text().await?),
                "lng" => form.lng = Some(field.text().await?),
                "name" => form.name = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "photo" => {
                    // Browsers send an empty, unnamed part when no file was picked.
                    let picked = field.file_name().is_some_and(|f| !f.is_empty());
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    if picked {
                        form.photo = Some(UploadedPhoto {
                            content_type,
                            bytes,
                        });
                    }
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing field: {field}")))
}

fn parse_coordinate(value: Option<&str>, field: &str) -> Result<f64, ApiError> {
    required(value, field)?
        .parse::<f64>()
        .map_err(|e| ApiError::BadRequest(format!("invalid {field}: {e}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// POST /api/v1/incidents
// ---------------------------------------------------------------------------

/// Create a report from a multipart form and broadcast it.
///
/// # Form Fields
///
/// - `type`: report category (required)
/// - `lat`, `lng`: coordinates (required)
/// - `name`, `description`: optional text, moderated
/// - `photo`: optional JPEG, PNG, or WebP image
pub async fn create_incident(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let IncidentForm {
        category,
        lat,
        lng,
        name,
        description,
        photo,
    } = IncidentForm::read(multipart).await?;

    let category: ReportCategory = required(category.as_deref(), "type")?.parse()?;
    let location = Coordinates::new(
        parse_coordinate(lat.as_deref(), "lat")?,
        parse_coordinate(lng.as_deref(), "lng")?,
    )?;

    let description = non_blank(description);
    if !state.moderator.allows(description.as_deref()).await {
        return Err(ApiError::Blocked {
            field: "description",
        });
    }
    let name = non_blank(name);
    if !state.moderator.allows(name.as_deref()).await {
        return Err(ApiError::Blocked { field: "name" });
    }

    let mut report = NewReport {
        category,
        location,
        name,
        description,
        photo: None,
    };
    report.check()?;

    if let Some(photo) = &photo {
        let stored = state
            .images
            .save(photo.content_type.as_deref(), &photo.bytes)
            .await?;
        report.photo = Some(stored);
    }
    let photo_name = report.photo.clone();

    let stored = match create_report(state.reports.as_ref(), report).await {
        Ok(stored) => stored,
        Err(e) => {
            if let Some(name) = photo_name
                && let Err(rm) = state.images.remove(&name).await
            {
                tracing::warn!(photo = %name, error = %rm, "Failed to remove orphaned photo");
            }
            return Err(e.into());
        }
    };

    let broadcast = ReportBroadcast::from_report(&stored, Utc::now());
    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        registry.broadcast_json(&broadcast).await;
    });

    let response = ReportResponse::new(stored, &state, host.as_deref());
    Ok((StatusCode::CREATED, Json(response)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/incidents
// ---------------------------------------------------------------------------

/// List reports newest first.
///
/// # Query Parameters
///
/// - `skip`: number of reports to skip (default 0)
/// - `limit`: page size, 1 to 200 (default 50)
pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Paginated<ReportResponse>>, ApiError> {
    let Query(params) = params?;
    let page = Page::new(
        params.skip.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    )?;

    let listed = list_reports(state.reports.as_ref(), page).await?;
    Ok(Json(project(listed, &state, host.as_deref())))
}

// ---------------------------------------------------------------------------
// GET /api/v1/incidents/nearby
// ---------------------------------------------------------------------------

/// Reports within `radius_km` of a point, newest first.
///
/// # Query Parameters
///
/// - `lat`, `lng`: center (required)
/// - `radius_km`: search radius (default 1)
/// - `skip`, `limit`: page window (defaults 0 and 50)
pub async fn nearby_incidents(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> Result<Json<Paginated<ReportResponse>>, ApiError> {
    let Query(params) = params?;
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(ApiError::BadRequest(String::from(
            "lat and lng query parameters are required",
        )));
    };
    let page = Page::new(
        params.skip.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    )?;
    let query = NearbyQuery::new(
        Coordinates { lat, lng },
        params.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
        page,
    )?;

    let found = query_nearby(state.reports.as_ref(), &query).await?;
    Ok(Json(project(found, &state, host.as_deref())))
}

fn project(
    page: Paginated<Report>,
    state: &AppState,
    host: Option<&str>,
) -> Paginated<ReportResponse> {
    Paginated {
        items: page
            .items
            .into_iter()
            .map(|report| ReportResponse::new(report, state, host))
            .collect(),
        total: page.total,
    }
}

// ---------------------------------------------------------------------------
// GET /api/v1/incidents/{id}
// ---------------------------------------------------------------------------

/// Return a single report.
pub async fn get_incident(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Path(id) = id?;
    let report = get_report(state.reports.as_ref(), ReportId(id)).await?;
    Ok(Json(ReportResponse::new(report, &state, host.as_deref())))
}

// ---------------------------------------------------------------------------
// POST /api/v1/incidents/{id}/{like,confirm,deny}
// ---------------------------------------------------------------------------

async fn react_to(
    state: &AppState,
    host: Option<&str>,
    id: Result<Path<i64>, PathRejection>,
    counter: ReactionCounter,
) -> Result<Json<ReportResponse>, ApiError> {
    let Path(id) = id?;
    let report = react(state.reports.as_ref(), ReportId(id), counter).await?;
    Ok(Json(ReportResponse::new(report, state, host)))
}

/// Add one like.
pub async fn like_incident(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    react_to(&state, host.as_deref(), id, ReactionCounter::Likes).await
}

/// Add one confirmation.
pub async fn confirm_incident(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    react_to(&state, host.as_deref(), id, ReactionCounter::Confirmations).await
}

/// Add one denial.
pub async fn deny_incident(
    State(state): State<Arc<AppState>>,
    RequestHost(host): RequestHost,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    react_to(&state, host.as_deref(), id, ReactionCounter::Denials).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert!(required(None, "type").is_err());
        assert!(required(Some("   "), "type").is_err());
        assert_eq!(required(Some(" accident "), "type").ok(), Some("accident"));
    }

    #[test]
    fn malformed_coordinate_is_bad_request() {
        let err = parse_coordinate(Some("north"), "lat");
        assert!(matches!(err, Err(ApiError::BadRequest(_))));
        assert_eq!(parse_coordinate(Some("52.5"), "lat").ok(), Some(52.5));
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(non_blank(Some(String::from("  "))), None);
        assert_eq!(non_blank(Some(String::from(" hi "))), Some(String::from("hi")));
    }
}
