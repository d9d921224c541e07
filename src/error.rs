use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error type returned by handlers and middleware. Each variant maps
/// to exactly one HTTP status so callers (and operators) can tell authentication,
/// authorization, and backend failures apart:
///
/// - `InvalidCredentials` is reported uniformly for a bad username *or* a bad
///   password, so login responses never reveal which half was wrong.
/// - `Unauthorized` is the role gate's rejection (guest, or role not in the
///   route's allow-list).
/// - `Forbidden` is the ownership check's rejection (authenticated, but not the
///   owner of the target resource).
/// - `Storage` is a database failure. It is surfaced as a 500 rather than being
///   silently downgraded, so a session-store outage is visible to operators
///   instead of quietly demoting every caller to guest.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error")]
    Internal,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "You are not authorized to perform this action".to_string(),
            ),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Unauthorized".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::Storage(e) => {
                // The underlying error is traced for operators; the response body
                // stays generic so no query or token detail leaks to clients.
                tracing::error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
