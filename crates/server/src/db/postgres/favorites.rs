//! Favorites queries.
//!
//! A user's list is a JSONB array in a single row, so add and remove are each
//! one statement and atomic on their own.

use async_trait::async_trait;
use sqlx::types::Json;

use readieg_core::{BookId, FavoriteEntry, UserId};

use super::PgStore;
use crate::db::{FavoritesRepository, RepositoryError};

#[async_trait]
impl FavoritesRepository for PgStore {
    async fn favorites_for(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError> {
        let books: Option<Json<Vec<FavoriteEntry>>> =
            sqlx::query_scalar("SELECT books FROM favorites WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(books.map(|Json(entries)| entries).unwrap_or_default())
    }

    async fn push_favorite(
        &self,
        user_id: UserId,
        entry: FavoriteEntry,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO favorites (user_id, books)
            VALUES ($1, jsonb_build_array($2::jsonb))
            ON CONFLICT (user_id) DO UPDATE
            SET books = favorites.books || EXCLUDED.books,
                updated_at = now()
            ",
        )
        .bind(user_id.as_uuid())
        .bind(Json(entry))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn pull_favorite(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE favorites
            SET books = COALESCE(
                    (SELECT jsonb_agg(entry ORDER BY position)
                     FROM jsonb_array_elements(favorites.books)
                          WITH ORDINALITY AS t(entry, position)
                     WHERE entry->>'bookId' <> $2),
                    '[]'::jsonb),
                updated_at = now()
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .bind(book_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
