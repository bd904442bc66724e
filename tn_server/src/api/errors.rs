//! Mapping of tournament errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use tourney::{ErrorKind, TournamentError};

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable error kind, e.g. `invalid_state`
    pub error: String,
    pub message: String,
}

/// Rejection type shared by the handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Result type shared by the handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// HTTP status for an error kind; storage timeouts map to 503
pub fn status_for(err: &TournamentError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::InvalidState | ErrorKind::Conflict | ErrorKind::CapacityExceeded => {
            StatusCode::CONFLICT
        }
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::InsufficientParticipants | ErrorKind::UnsupportedFormat => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::PersistenceFailure if err.is_timeout() => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a tournament error into a client-safe response
pub fn error_response(err: TournamentError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.kind().as_str().to_string(),
            message: err.client_message(),
        }),
    )
}

/// 400 response for malformed request input
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: ErrorKind::Validation.as_str().to_string(),
            message: message.into(),
        }),
    )
}

/// 404 response for a lookup that found nothing
pub fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: ErrorKind::NotFound.as_str().to_string(),
            message: message.into(),
        }),
    )
}
