//! Transit disruption prediction endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use travelhi_types::{DisruptionPrediction, TrafficReport};

use crate::error::ApiError;
use crate::state::AppState;

/// Estimate the disruption described by a transit report.
///
/// Responds with JSON `null` when the report's free text is rejected by
/// moderation, and with 503 when no LLM backend is configured.
///
/// # Route
///
/// `POST /api/v1/disruptions/predict`
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TrafficReport>, JsonRejection>,
) -> Result<Json<Option<DisruptionPrediction>>, ApiError> {
    let Some(predictor) = state.predictor.as_ref() else {
        return Err(ApiError::ServiceUnavailable(String::from(
            "disruption prediction is not configured",
        )));
    };

    let Json(report) = payload?;
    report.check()?;

    let prediction = predictor.predict(&report).await?;
    if prediction.is_none() {
        tracing::info!(city = %report.city, "Transit report blocked by moderation");
    }
    Ok(Json(prediction))
}
