//! Catalog service.
//!
//! Every parameter is validated here, before the store is touched.

use serde::Serialize;
use serde_json::{Map, Value};

use readieg_core::{Book, BookDraft, BookId, BookPayload, BookQuery, ListingParams};

use crate::db::Store;
use crate::error::{AppError, Result};

/// A listed book: the full record, or the requested projection of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookView {
    Full(Book),
    Projected(Map<String, Value>),
}

/// Book listing, lookup and maintenance.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// List books matching the raw listing parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` for a bad `minRating`, year bound
    /// or `limit`, and `AppError::Database` if the store fails.
    pub async fn list(&self, params: &ListingParams) -> Result<Vec<BookView>> {
        let query = BookQuery::from_params(params)?;

        let books = self
            .store
            .find_books(&query.filter, query.sort, query.limit)
            .await?;

        Ok(match &query.projection {
            Some(projection) => books
                .iter()
                .map(|b| BookView::Projected(projection.apply(b)))
                .collect(),
            None => books.into_iter().map(BookView::Full).collect(),
        })
    }

    /// Fetch one book by its textual id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the id is malformed and
    /// `AppError::NotFound` if no such book exists.
    pub async fn get(&self, raw_id: &str) -> Result<Book> {
        let id = parse_book_id(raw_id)?;
        self.store.find_book(id).await?.ok_or_else(book_not_found)
    }

    /// Validate and insert a new book.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the payload is invalid.
    pub async fn create(&self, payload: BookPayload) -> Result<Book> {
        let draft = BookDraft::try_from(payload)?;
        let book = self.store.insert_book(draft).await?;
        tracing::info!(book_id = %book.id, "Book created");
        Ok(book)
    }

    /// Overwrite an existing book.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the id or payload is invalid
    /// and `AppError::NotFound` if no such book exists.
    pub async fn update(&self, raw_id: &str, payload: BookPayload) -> Result<()> {
        let id = parse_book_id(raw_id)?;
        let draft = BookDraft::try_from(payload)?;

        if !self.store.update_book(id, draft).await? {
            return Err(book_not_found());
        }
        tracing::info!(book_id = %id, "Book updated");
        Ok(())
    }

    /// Delete a book. Favorites entries pointing at it are left in place.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the id is malformed and
    /// `AppError::NotFound` if no such book exists.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = parse_book_id(raw_id)?;

        if !self.store.delete_book(id).await? {
            return Err(book_not_found());
        }
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }
}

fn parse_book_id(raw: &str) -> Result<BookId> {
    BookId::parse(raw).map_err(|_| AppError::InvalidParameter("Invalid id".to_string()))
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::InMemoryStore;

    fn payload(value: Value) -> BookPayload {
        serde_json::from_value(value).unwrap()
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(&store);
        for value in [
            json!({"title": "The Hobbit", "author": "J.R.R. Tolkien", "year": 1937, "rating": 4.8, "tags": ["fantasy", "classic"]}),
            json!({"title": "Dune", "author": "Frank Herbert", "year": 1965, "rating": 4.6, "tags": ["sci-fi"]}),
            json!({"title": "The Fellowship of the Ring", "author": "J.R.R. Tolkien", "series": "The Lord of the Rings", "seriesNumber": 1, "year": 1954, "rating": 4.9, "tags": ["fantasy"]}),
        ] {
            catalog.create(payload(value)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_projects_when_fields_given() {
        let store = seeded().await;
        let catalog = CatalogService::new(&store);
        let params = ListingParams {
            fields: Some("title,bogus,year".to_owned()),
            sort: Some("year".to_owned()),
            ..ListingParams::default()
        };

        let views = catalog.list(&params).await.unwrap();
        let value = serde_json::to_value(&views).unwrap();
        let first = value[0].as_object().unwrap();

        let mut keys: Vec<_> = first.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "title", "year"]);
        assert_eq!(first["title"], "The Hobbit");
    }

    #[tokio::test]
    async fn test_list_returns_full_records_without_projection() {
        let store = seeded().await;
        let catalog = CatalogService::new(&store);
        let params = ListingParams {
            fields: Some("nothing,useful".to_owned()),
            ..ListingParams::default()
        };

        let views = catalog.list(&params).await.unwrap();
        assert_eq!(views.len(), 3);
        assert!(views.iter().all(|v| matches!(v, BookView::Full(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_parameters_before_querying() {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(&store);
        let params = ListingParams {
            limit: Some("0".to_owned()),
            ..ListingParams::default()
        };

        let err = catalog.list(&params).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(ref m) if m == "Invalid limit (1..200)"));
    }

    #[tokio::test]
    async fn test_malformed_id_is_distinct_from_missing() {
        let store = seeded().await;
        let catalog = CatalogService::new(&store);

        let err = catalog.get("not-an-id").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(ref m) if m == "Invalid id"));

        let err = catalog
            .get(&BookId::generate().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Book not found"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = seeded().await;
        let catalog = CatalogService::new(&store);
        let book = catalog
            .create(payload(json!({"title": "Draft", "author": "Someone"})))
            .await
            .unwrap();
        let id = book.id.to_string();

        catalog
            .update(&id, payload(json!({"title": "Final", "author": "Someone", "year": "2001"})))
            .await
            .unwrap();
        let updated = catalog.get(&id).await.unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.year, Some(2001));
        assert_eq!(updated.created_at, book.created_at);

        let err = catalog
            .update(&id, payload(json!({"title": "Final"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));

        catalog.delete(&id).await.unwrap();
        assert!(matches!(
            catalog.delete(&id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
