use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// RepoError
///
/// Failures surfaced by the persistence layer. Uniqueness violations are split out
/// because the API answers them differently from generic database faults.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("a user with that username already exists")]
    DuplicateUsername,

    #[error("a movie with that title already exists")]
    DuplicateTitle,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ApiError
///
/// Every failure a handler can return. The status codes and bodies follow the public
/// API contract, including its quirks: validation and duplicate-username failures on
/// signup answer `200` with `success: false`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("A user with that username already exists.")]
    DuplicateUsername,

    #[error("Authentication failed.")]
    Unauthorized,

    #[error("Movie not found")]
    NotFound,

    #[error("HTTP method not supported.")]
    MethodNotAllowed,

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateUsername => ApiError::DuplicateUsername,
            RepoError::DuplicateTitle => ApiError::Conflict("A movie with that title already exists."),
            RepoError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::Validation(_) | ApiError::DuplicateUsername => (
                StatusCode::OK,
                Json(json!({ "success": false, "msg": message })),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "msg": message })),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "message": message })),
            )
                .into_response(),
            ApiError::Conflict(_) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(detail) => {
                // Detail stays server-side; the client only sees the generic message.
                tracing::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
