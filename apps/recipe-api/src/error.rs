//! Server error types.

use api_protocol::{ErrorBody, ErrorCode, FieldErrors, INVALID_CREDENTIALS, NON_FIELD_ERRORS};
use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use recipe_store::StoreError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request body failed validation.
    #[error("Invalid input")]
    Validation(FieldErrors),

    /// Malformed request body.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Email/password did not match an active user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, invalid, expired or revoked token.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Resource not found, or not owned by the caller.
    #[error("Not found")]
    NotFound,

    /// Store error.
    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ServerError {
    /// Creates a validation error for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServerError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::with_fields(ErrorCode::ValidationError, "Invalid input", fields),
            ),
            ServerError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(ErrorCode::ValidationError, msg),
            ),
            ServerError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                ErrorBody::with_fields(
                    ErrorCode::InvalidCredentials,
                    INVALID_CREDENTIALS,
                    FieldErrors::single(NON_FIELD_ERRORS, INVALID_CREDENTIALS),
                ),
            ),
            ServerError::Auth(e @ (AuthError::PasswordHash(_) | AuthError::JwtEncoding(_))) => {
                tracing::error!(error = %e, "Credential processing failed");
                internal_error()
            }
            ServerError::AuthenticationRequired | ServerError::Auth(_) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(
                    ErrorCode::AuthenticationRequired,
                    "Authentication credentials were not provided or are invalid",
                ),
            ),
            ServerError::NotFound | ServerError::Database(StoreError::NotFound { .. }) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(ErrorCode::NotFound, "Not found"),
            ),
            ServerError::Database(e) => {
                tracing::error!(error = %e, "Store operation failed");
                internal_error()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal_error() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new(ErrorCode::InternalError, "Internal server error"),
    )
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
