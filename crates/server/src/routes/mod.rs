//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (store reachable)
//!
//! # Catalog
//! GET    /api/books               - Listing (filters, sort, fields, limit)
//! GET    /api/books/{id}          - One book
//! POST   /api/books               - Create (requires auth)
//! PUT    /api/books/{id}          - Replace (requires auth)
//! DELETE /api/books/{id}          - Delete (requires auth)
//!
//! # Favorites (requires auth)
//! GET    /api/favorites           - Raw {bookId, addedAt} list
//! GET    /api/favorites/full      - List joined with the catalog
//! POST   /api/favorites/{bookId}  - Add
//! DELETE /api/favorites/{bookId}  - Remove every entry for the book
//!
//! # Auth
//! GET  /api/auth/me               - Session introspection
//! POST /api/auth/signup           - Create account and log in
//! POST /api/auth/login            - Log in
//! POST /api/auth/logout           - Destroy session
//! ```

pub mod auth;
pub mod books;
pub mod favorites;
pub mod health;

use axum::Router;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Create the full route tree.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(books::router())
        .merge(favorites::router())
        .nest("/api/auth", auth::router())
        .fallback(not_found)
}

/// `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
