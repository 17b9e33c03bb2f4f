//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use readieg_core::{BookError, QueryError};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Message returned in place of any server-side failure.
const SERVER_ERROR: &str = "Server error";

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range client input.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// Well-formed identifier with no matching record.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            _ => false,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        Self::InvalidParameter(err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        Self::InvalidParameter(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        Self::InvalidParameter(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(err) => match err {
                AuthError::SignupRejected(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::InvalidParameter(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::Auth(AuthError::SignupRejected(reason)) => {
                tracing::debug!(reason, "Signup rejected");
                "Unable to create account".to_string()
            }
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            _ => SERVER_ERROR.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Book not found".to_string());
        assert_eq!(err.to_string(), "Not found: Book not found");

        let err = AppError::from(QueryError::InvalidLimit);
        assert_eq!(err.to_string(), "Invalid parameter: Invalid limit (1..200)");
    }

    #[tokio::test]
    async fn test_client_errors_carry_their_message() {
        assert_eq!(
            render(AppError::from(QueryError::InvalidMinRating)).await,
            (StatusCode::BAD_REQUEST, json!({"error": "Invalid minRating"}))
        );
        assert_eq!(
            render(AppError::from(BookError::MissingRequired)).await,
            (
                StatusCode::BAD_REQUEST,
                json!({"error": "Missing required fields: title, author"})
            )
        );
        assert_eq!(
            render(AppError::NotFound("Book not found".to_string())).await,
            (StatusCode::NOT_FOUND, json!({"error": "Book not found"}))
        );
        assert_eq!(
            render(AppError::Unauthorized).await,
            (StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"}))
        );
    }

    #[tokio::test]
    async fn test_auth_errors_are_generic() {
        assert_eq!(
            render(AppError::Auth(AuthError::SignupRejected("password too short"))).await,
            (
                StatusCode::BAD_REQUEST,
                json!({"error": "Unable to create account"})
            )
        );
        assert_eq!(
            render(AppError::Auth(AuthError::InvalidCredentials)).await,
            (StatusCode::UNAUTHORIZED, json!({"error": "Invalid credentials"}))
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) = render(AppError::Database(RepositoryError::DataCorruption(
            "users.email holds garbage".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Server error"}));

        let (status, body) = render(AppError::Auth(AuthError::PasswordHash)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Server error"}));

        let (status, _) = render(AppError::Internal("boom".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
