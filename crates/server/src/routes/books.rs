//! Catalog API handlers.
//!
//! Reads are public; writes require a session.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

use readieg_core::{Book, BookId, BookPayload, ListingParams};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::BookView;
use crate::state::AppState;

use super::MessageResponse;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
}

/// Response for a created book.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: BookId,
}

/// List books.
///
/// # Errors
///
/// Returns 400 for an invalid listing parameter.
pub async fn list_books(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListingParams>, QueryRejection>,
) -> Result<Json<Vec<BookView>>> {
    let Query(params) = params?;
    Ok(Json(state.catalog().list(&params).await?))
}

/// Get one book.
///
/// # Errors
///
/// Returns 400 for a malformed id and 404 for an unknown one.
pub async fn get_book(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Book>> {
    let Path(id) = id?;
    Ok(Json(state.catalog().get(&id).await?))
}

/// Create a book.
///
/// # Errors
///
/// Returns 400 if `title` or `author` is missing or a number is invalid.
pub async fn create_book(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    body: std::result::Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(payload) = body?;
    let book = state.catalog().create(payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: book.id })))
}

/// Replace a book's fields.
///
/// # Errors
///
/// Returns 400 for a malformed id or body and 404 for an unknown id.
pub async fn update_book(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = id?;
    let Json(payload) = body?;
    state.catalog().update(&id, payload).await?;
    Ok(Json(MessageResponse::new("Updated")))
}

/// Delete a book.
///
/// # Errors
///
/// Returns 400 for a malformed id and 404 for an unknown one.
pub async fn delete_book(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = id?;
    state.catalog().delete(&id).await?;
    Ok(Json(MessageResponse::new("Deleted")))
}
