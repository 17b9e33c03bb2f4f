//! Favorites service.
//!
//! Every operation is scoped to the session user's own list.

use chrono::Utc;

use readieg_core::favorites::distinct_book_ids;
use readieg_core::{BookId, FavoriteEntry, ResolvedFavorite, UserId, resolve};

use crate::db::Store;
use crate::error::{AppError, Result};

/// Per-user favorites lists.
pub struct FavoritesService<'a> {
    store: &'a dyn Store,
}

impl<'a> FavoritesService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The raw `{bookId, addedAt}` list; empty if the user has none yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>> {
        Ok(self.store.favorites_for(user_id).await?)
    }

    /// Append a book to the list. The book is not required to exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the id is malformed.
    pub async fn add(&self, user_id: UserId, raw_book_id: &str) -> Result<()> {
        let book_id = parse_book_id(raw_book_id)?;
        self.store
            .push_favorite(user_id, FavoriteEntry::new(book_id, Utc::now()))
            .await?;
        tracing::debug!(%user_id, %book_id, "Favorite added");
        Ok(())
    }

    /// Drop every entry for a book. Removing an absent book succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the id is malformed.
    pub async fn remove(&self, user_id: UserId, raw_book_id: &str) -> Result<()> {
        let book_id = parse_book_id(raw_book_id)?;
        self.store.pull_favorite(user_id, book_id).await?;
        tracing::debug!(%user_id, %book_id, "Favorite removed");
        Ok(())
    }

    /// The list joined with the catalog.
    ///
    /// Entries whose book has been deleted are left out.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn resolved(&self, user_id: UserId) -> Result<Vec<ResolvedFavorite>> {
        let entries = self.store.favorites_for(user_id).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let books = self
            .store
            .find_books_by_ids(&distinct_book_ids(&entries))
            .await?;

        Ok(resolve(&entries, &books))
    }
}

fn parse_book_id(raw: &str) -> Result<BookId> {
    BookId::parse(raw).map_err(|_| AppError::InvalidParameter("Invalid bookId".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use readieg_core::{BookDraft, BookPayload};
    use serde_json::json;

    use super::*;
    use crate::db::{BookRepository, InMemoryStore};

    async fn add_book(store: &InMemoryStore, title: &str) -> BookId {
        let payload: BookPayload =
            serde_json::from_value(json!({"title": title, "author": "Someone", "year": 1999}))
                .unwrap();
        store
            .insert_book(BookDraft::try_from(payload).unwrap())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_missing_list_reads_as_empty() {
        let store = InMemoryStore::new();
        let favorites = FavoritesService::new(&store);
        let user = UserId::generate();

        assert!(favorites.list(user).await.unwrap().is_empty());
        assert!(favorites.resolved(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_malformed_ids_only() {
        let store = InMemoryStore::new();
        let favorites = FavoritesService::new(&store);
        let user = UserId::generate();

        let err = favorites.add(user, "42").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(ref m) if m == "Invalid bookId"));

        // Existence is not checked.
        favorites
            .add(user, &BookId::generate().to_string())
            .await
            .unwrap();
        assert_eq!(favorites.list(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trips() {
        let store = InMemoryStore::new();
        let favorites = FavoritesService::new(&store);
        let user = UserId::generate();
        let kept = add_book(&store, "Kept").await.to_string();
        let churn = add_book(&store, "Churn").await.to_string();

        favorites.add(user, &kept).await.unwrap();
        let before = favorites.list(user).await.unwrap();

        favorites.add(user, &churn).await.unwrap();
        favorites.add(user, &churn).await.unwrap();
        favorites.remove(user, &churn).await.unwrap();

        assert_eq!(favorites.list(user).await.unwrap(), before);
        favorites.remove(user, &churn).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolved_omits_deleted_books() {
        let store = InMemoryStore::new();
        let favorites = FavoritesService::new(&store);
        let user = UserId::generate();
        let first = add_book(&store, "First").await;
        let doomed = add_book(&store, "Doomed").await;
        let last = add_book(&store, "Last").await;

        for id in [last, doomed, first, last] {
            favorites.add(user, &id.to_string()).await.unwrap();
        }
        store.delete_book(doomed).await.unwrap();

        let rows = favorites.resolved(user).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.book.title.as_str()).collect();
        assert_eq!(titles, vec!["Last", "First", "Last"]);
        assert_eq!(favorites.list(user).await.unwrap().len(), 4);
    }
}
