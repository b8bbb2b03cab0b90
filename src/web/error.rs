// Error types for the relay endpoint

use crate::{provider::ProviderError, upload::UploadRejection};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::models::ErrorBody;

/// Every variant renders as `{ "error": "<message>" }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    MethodNotAllowed,
    FileTooLarge,
    MissingApiKey,
    Provider { status: StatusCode, body: String },
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            Self::FileTooLarge => (
                StatusCode::BAD_REQUEST,
                UploadRejection::TooLarge.to_string(),
            ),
            Self::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ProviderError::MissingApiKey.to_string(),
            ),
            Self::Provider { status, body } => (
                status,
                format!("Remove.bg API error: {} - {}", status.as_u16(), body),
            ),
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorBody::new(error_message))).into_response()
    }
}

impl From<UploadRejection> for ApiError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::TooLarge => Self::FileTooLarge,
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey => Self::MissingApiKey,
            ProviderError::Rejected { status, body } => Self::Provider { status, body },
            other => {
                // Cause stays in the server log; the caller only sees a generic message
                error!("Provider call failed: {}", other);
                Self::InternalServerError
            }
        }
    }
}
