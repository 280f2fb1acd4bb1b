//! API request, response and error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::alerts::Alert;
use crate::emergency::EmergencyMode;
use crate::error::CoreError;
use crate::policy::Objective;

/// Active alerts plus the immutable history.
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub active: Vec<Alert>,
    pub history: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct StreamingResponse {
    pub streaming: bool,
}

/// Result of an emergency transition.
#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: EmergencyMode,
    /// Alerts appended by the transition.
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectiveRequest {
    pub objective: String,
}

#[derive(Debug, Serialize)]
pub struct ObjectiveResponse {
    pub objective: Objective,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Handler error carrying the status code to respond with.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match err {
            CoreError::InvalidReading(_) | CoreError::UnknownObjective(_) => {
                StatusCode::BAD_REQUEST
            }
            CoreError::UnknownAlert(_) => StatusCode::NOT_FOUND,
            CoreError::AlreadyInEmergency
            | CoreError::NotInEmergency
            | CoreError::EmergencyActive(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadingError;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (CoreError::AlreadyInEmergency, StatusCode::CONFLICT),
            (CoreError::NotInEmergency, StatusCode::CONFLICT),
            (CoreError::EmergencyActive("fault injection"), StatusCode::CONFLICT),
            (CoreError::UnknownAlert("x".into()), StatusCode::NOT_FOUND),
            (CoreError::UnknownObjective("x".into()), StatusCode::BAD_REQUEST),
            (
                CoreError::InvalidReading(ReadingError::NonFinite {
                    field: "grid.load".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }
}
