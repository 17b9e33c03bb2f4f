//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// Clients only ever see one generic message per operation; the variant
/// payloads are for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signup input failed validation or the email is taken.
    #[error("signup rejected: {0}")]
    SignupRejected(&'static str),

    /// Invalid credentials (missing fields, unknown email or wrong password).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
