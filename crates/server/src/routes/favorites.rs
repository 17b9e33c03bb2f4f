//! Favorites API handlers. Every route requires a session.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::{get, post},
};

use readieg_core::{FavoriteEntry, ResolvedFavorite};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::MessageResponse;

/// Build the favorites router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/favorites", get(list_favorites))
        .route(
            "/api/favorites/full",
            get(list_resolved_favorites)
                .post(add_to_full)
                .delete(remove_from_full),
        )
        .route(
            "/api/favorites/{book_id}",
            post(add_favorite).delete(remove_favorite),
        )
}

/// The caller's raw favorites list.
///
/// # Errors
///
/// Returns 401 without a session.
pub async fn list_favorites(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<FavoriteEntry>>> {
    Ok(Json(state.favorites().list(user.id).await?))
}

/// Add a book to the caller's favorites.
///
/// # Errors
///
/// Returns 400 for a malformed book id.
pub async fn add_favorite(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    book_id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(book_id) = book_id?;
    state.favorites().add(user.id, &book_id).await?;
    Ok(Json(MessageResponse::new("Added to favorites")))
}

/// Remove a book from the caller's favorites.
///
/// # Errors
///
/// Returns 400 for a malformed book id.
pub async fn remove_favorite(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    book_id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(book_id) = book_id?;
    state.favorites().remove(user.id, &book_id).await?;
    Ok(Json(MessageResponse::new("Removed from favorites")))
}

/// `full` shadows the `{book_id}` route, so writes to it are handled as a
/// book id of `full`, which is never valid.
const FULL_SEGMENT: &str = "full";

/// `POST /api/favorites/full`.
///
/// # Errors
///
/// Always returns 400 "Invalid bookId" for a signed-in caller.
pub async fn add_to_full(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    state.favorites().add(user.id, FULL_SEGMENT).await?;
    Ok(Json(MessageResponse::new("Added to favorites")))
}

/// `DELETE /api/favorites/full`.
///
/// # Errors
///
/// Always returns 400 "Invalid bookId" for a signed-in caller.
pub async fn remove_from_full(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    state.favorites().remove(user.id, FULL_SEGMENT).await?;
    Ok(Json(MessageResponse::new("Removed from favorites")))
}

/// The caller's favorites joined with the catalog.
///
/// # Errors
///
/// Returns 401 without a session.
pub async fn list_resolved_favorites(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResolvedFavorite>>> {
    Ok(Json(state.favorites().resolved(user.id).await?))
}
