//! Error taxonomy for the API service
//!
//! Every core operation fails fast with the most specific variant. Handlers
//! return `ApiError` directly; the `IntoResponse` impl maps each variant to
//! its HTTP status with a JSON `{"error": ...}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error type shared by the repositories and route handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Referenced ride/request/user does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller is not the authorized actor for the operation
    #[error("Forbidden")]
    Forbidden,

    /// A passenger acting on their own ride
    #[error("Cannot request to join your own ride")]
    SelfReference,

    /// Operation not valid for the entity's current status
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Uniqueness violation (duplicate request, duplicate feedback)
    #[error("Conflict: {0}")]
    Conflict(&'static str),

    /// Business rule not met independent of the state machine
    #[error("Precondition failed: {0}")]
    PreconditionFailed(&'static str),

    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed input rejected at the boundary
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Store or transport failure, surfaced as a generic failure
    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden | ApiError::SelfReference => StatusCode::FORBIDDEN,
            ApiError::InvalidState(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Map a sqlx error, turning a unique-constraint violation into `Conflict`
pub fn conflict_on_unique(err: sqlx::Error, what: &'static str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return ApiError::Conflict(what);
        }
    }
    ApiError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (ApiError::NotFound("ride"), StatusCode::NOT_FOUND),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::SelfReference, StatusCode::FORBIDDEN),
            (
                ApiError::InvalidState("ride is not open"),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Conflict("request already exists"),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::PreconditionFailed("vehicle registration required"),
                StatusCode::PRECONDITION_FAILED,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
