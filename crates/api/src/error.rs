//! API error types and their HTTP mapping
//!
//! Every handler returns [`ApiResult`]; this module is the single place
//! the error taxonomy turns into HTTP statuses. Login failures collapse to
//! one 401 message regardless of cause, and internal failures never leak
//! detail into the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::{JwtError, PasswordError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request field validation failure, message is user-facing.
    #[error("{0}")]
    Validation(String),
    /// Unique-constraint style conflicts (username/email taken).
    #[error("{0}")]
    Conflict(String),
    /// Unknown user and wrong password share this variant on purpose.
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// Valid-looking request from a caller we no longer recognize.
    #[error("Invalid or expired token")]
    Unauthorized,
    #[error("{0}")]
    RateLimited(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("password hashing error")]
    Password(#[from] PasswordError),
    #[error("token issuance error")]
    Token(#[from] JwtError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
            ApiError::RateLimited(message) => (StatusCode::TOO_MANY_REQUESTS, message.clone()),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::Password(err) => {
                tracing::error!(error = %err, "password hashing error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
            ApiError::Token(err) => {
                tracing::error!(error = %err, "token issuance error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
