//! Error types for the API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body
//! is always `{"error": <message>, "status": <code>}`.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use travelhi_ai::AiError;
use travelhi_core::CoreError;
use travelhi_types::InputError;

use crate::images::ImageError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Input failed validation. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The request could not be understood (bad multipart, unknown
    /// category, malformed field).
    #[error("{0}")]
    BadRequest(String),

    /// A text field was rejected by moderation.
    #[error("{field} contains disallowed content")]
    Blocked {
        /// The rejected form field.
        field: &'static str,
    },

    /// The requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// The uploaded photo exceeds the size cap.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The uploaded photo has an unsupported type.
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// A dependency (the LLM) is not configured or not reachable.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Any other internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) | Self::Blocked { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::UnknownVariant { .. } => Self::BadRequest(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Input(input) => Self::from(input),
            CoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            CoreError::Store(store) => Self::Storage(store.to_string()),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Empty => Self::Validation(err.to_string()),
            ImageError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            ImageError::Unsupported(_) => Self::UnsupportedMediaType(err.to_string()),
            ImageError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        Self::ServiceUnavailable(format!("disruption prediction unavailable: {err}"))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        match err.status() {
            StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(err.body_text()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::UnsupportedMediaType(err.body_text()),
            _ => Self::BadRequest(err.body_text()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Storage(detail) | Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                String::from("internal server error")
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use travelhi_core::StoreError;

    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let invalid = ApiError::from(CoreError::Input(InputError::Coordinates { lat: 91.0, lng: 0.0 }));
        let missing = ApiError::from(CoreError::NotFound { kind: "report", id: 4 });
        let store = ApiError::from(CoreError::Store(StoreError::Backend(String::from("down"))));

        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "report with id=4 not found");
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_category_is_bad_request() {
        let err = ApiError::from(InputError::UnknownVariant {
            kind: "report category",
            value: String::from("meteor"),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn image_errors_map_to_statuses() {
        assert_eq!(ApiError::from(ImageError::Empty).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::from(ImageError::TooLarge { size: 9, max: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(ImageError::Unsupported(String::from("image/gif"))).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = ApiError::Storage(String::from("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
