//! Authentication route handlers.
//!
//! Handles signup, login, logout and session introspection. Failures use one
//! generic message per operation so responses never reveal which check failed
//! or whether an email is registered.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthError;
use crate::state::AppState;

/// Build the auth router, mounted under `/api/auth`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Signup request body.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Successful signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub user: User,
}

/// Session introspection result.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Logout result.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Report whether the caller has a live session.
///
/// A session whose user no longer exists is destroyed.
///
/// # Errors
///
/// Returns 500 if the user lookup fails.
pub async fn me(
    OptionalAuth(current): OptionalAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<MeResponse>> {
    let Some(current) = current else {
        return Ok(Json(MeResponse {
            authenticated: false,
            user: None,
        }));
    };

    let user = state.auth().current_user(current.id).await?;
    if user.is_none() {
        tracing::info!(user_id = %current.id, "Session refers to a missing user, destroying it");
        clear_current_user(&session).await?;
    }

    Ok(Json(MeResponse {
        authenticated: user.is_some(),
        user,
    }))
}

/// Create an account and log it in.
///
/// # Errors
///
/// Returns 400 "Unable to create account" for any validation failure or a
/// taken email.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(body) = body.map_err(|_| AuthError::SignupRejected("malformed body"))?;

    let user = state
        .auth()
        .signup(
            body.name.as_deref().unwrap_or_default(),
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    set_current_user(&session, CurrentUser { id: user.id }).await?;
    set_sentry_user(&user.id);
    tracing::info!(user_id = %user.id, "User signed up");

    Ok((StatusCode::CREATED, Json(AuthResponse { ok: true, user })))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns 401 "Invalid credentials" for missing fields, an unknown email or
/// a wrong password alike.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(body) = body.map_err(|_| AuthError::InvalidCredentials)?;

    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AuthError::InvalidCredentials.into());
    };

    let user = state.auth().login(&email, &password).await?;

    set_current_user(&session, CurrentUser { id: user.id }).await?;
    set_sentry_user(&user.id);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { ok: true, user }))
}

/// Destroy the session. Always succeeds.
pub async fn logout(session: Session) -> Json<OkResponse> {
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to destroy session on logout");
    }
    clear_sentry_user();

    Json(OkResponse { ok: true })
}
