//! JSON envelopes for API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::error::ConsoleError;

/// Successful API response.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            data,
        })
    }
}

/// Error API response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: &'static str,
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    /// Short heading for the error panel.
    pub title: &'static str,
    pub message: String,
    pub kind: &'static str,
    /// Whether the page should offer the manual reset action.
    pub reset_suggested: bool,
}

impl From<&ConsoleError> for ErrorDetails {
    fn from(err: &ConsoleError) -> Self {
        Self {
            title: err.category(),
            message: err.user_message(),
            kind: err.kind(),
            reset_suggested: err.suggests_reset(),
        }
    }
}

/// Error response carrying its HTTP status.
#[derive(Debug)]
pub struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl ApiErrorResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<ConsoleError> for ApiErrorResponse {
    fn from(err: ConsoleError) -> Self {
        let status = match &err {
            ConsoleError::EmptyQuery | ConsoleError::Query(_) | ConsoleError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ConsoleError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsoleError::OpenFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConsoleError::NoActiveConnection
            | ConsoleError::Connection(_)
            | ConsoleError::ResetFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ConsoleError::Llm(_) => StatusCode::BAD_GATEWAY,
            ConsoleError::Unexpected(_) | ConsoleError::Config(_) | ConsoleError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            error: ApiError {
                status: "error",
                error: ErrorDetails::from(&err),
            },
        }
    }
}
