//! In-process storage engine.
//!
//! Holds everything in `RwLock`-guarded maps. Each trait method takes one lock
//! for its whole duration, so every mutation is atomic with respect to other
//! requests, matching what the `PostgreSQL` engine gets from single statements.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use readieg_core::query::{BookFilter, BookSort, Limit, select_books};
use readieg_core::{Book, BookDraft, BookId, Email, FavoriteEntry, Favorites, UserId};

use super::{BookRepository, FavoritesRepository, RepositoryError, Store, UserRepository};
use crate::models::user::User;

struct Account {
    user: User,
    password_hash: String,
}

/// Storage engine backed by process memory.
///
/// Data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, Account>>,
    emails: RwLock<HashMap<Email, UserId>>,
    // Keyed by time-ordered id, so iteration is insertion order.
    books: RwLock<BTreeMap<BookId, Book>>,
    favorites: RwLock<HashMap<UserId, Favorites>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        // Lock order: emails, then users.
        let mut emails = self.emails.write().await;
        if emails.contains_key(email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::generate(),
            name: name.to_owned(),
            email: email.clone(),
            created_at: Utc::now(),
        };

        emails.insert(email.clone(), user.id);
        self.users.write().await.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );

        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let emails = self.emails.read().await;
        let Some(id) = emails.get(email) else {
            return Ok(None);
        };

        Ok(self
            .users
            .read()
            .await
            .get(id)
            .map(|a| (a.user.clone(), a.password_hash.clone())))
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).map(|a| a.user.clone()))
    }
}

#[async_trait]
impl BookRepository for InMemoryStore {
    async fn find_books(
        &self,
        filter: &BookFilter,
        sort: BookSort,
        limit: Limit,
    ) -> Result<Vec<Book>, RepositoryError> {
        let books = self.books.read().await;
        Ok(select_books(books.values(), filter, sort, limit))
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn find_books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        let books = self.books.read().await;
        Ok(ids.iter().filter_map(|id| books.get(id).cloned()).collect())
    }

    async fn insert_book(&self, draft: BookDraft) -> Result<Book, RepositoryError> {
        let book = Book::from_draft(BookId::generate(), draft, Utc::now());
        self.books.write().await.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: BookId, draft: BookDraft) -> Result<bool, RepositoryError> {
        let mut books = self.books.write().await;
        let Some(book) = books.get_mut(&id) else {
            return Ok(false);
        };
        book.apply(draft, Utc::now());
        Ok(true)
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError> {
        Ok(self.books.write().await.remove(&id).is_some())
    }

    async fn count_books(&self) -> Result<u64, RepositoryError> {
        Ok(self.books.read().await.len() as u64)
    }
}

#[async_trait]
impl FavoritesRepository for InMemoryStore {
    async fn favorites_for(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError> {
        Ok(self
            .favorites
            .read()
            .await
            .get(&user_id)
            .map(|f| f.books.clone())
            .unwrap_or_default())
    }

    async fn push_favorite(
        &self,
        user_id: UserId,
        entry: FavoriteEntry,
    ) -> Result<(), RepositoryError> {
        self.favorites
            .write()
            .await
            .entry(user_id)
            .or_insert_with(|| Favorites::empty(user_id))
            .push(entry);
        Ok(())
    }

    async fn pull_favorite(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<(), RepositoryError> {
        if let Some(favorites) = self.favorites.write().await.get_mut(&user_id) {
            favorites.remove_all(book_id);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use readieg_core::query::{SortDirection, SortField};
    use readieg_core::{BookPayload, BookQuery, ListingParams};
    use serde_json::json;

    use super::*;

    fn draft(value: serde_json::Value) -> BookDraft {
        let payload: BookPayload = serde_json::from_value(value).unwrap();
        BookDraft::try_from(payload).unwrap()
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        for value in [
            json!({"title": "The Hobbit", "author": "J.R.R. Tolkien", "year": 1937, "rating": 4.8, "tags": ["fantasy"]}),
            json!({"title": "Dune", "author": "Frank Herbert", "year": 1965, "rating": 4.6, "tags": ["sci-fi"]}),
            json!({"title": "Mistborn", "author": "Brandon Sanderson", "year": 2006, "tags": ["fantasy"]}),
        ] {
            store.insert_book(draft(value)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let store = InMemoryStore::new();
        let email = Email::parse("ada@example.com").unwrap();
        store.create_user("Ada", &email, "hash").await.unwrap();

        let again = Email::parse("ADA@example.com").unwrap();
        let err = store.create_user("Ada", &again, "hash").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.users.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_user_by_email_returns_hash() {
        let store = InMemoryStore::new();
        let email = Email::parse("ada@example.com").unwrap();
        let user = store.create_user("Ada", &email, "secret-hash").await.unwrap();

        let (found, hash) = store.find_user_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(hash, "secret-hash");
        assert_eq!(store.find_user_by_id(user.id).await.unwrap(), Some(user));
        assert!(store.find_user_by_id(UserId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_books_applies_filter_sort_and_limit() {
        let store = seeded().await;
        let params = ListingParams {
            tag: Some("fantasy".to_owned()),
            sort: Some("year:desc".to_owned()),
            limit: Some("1".to_owned()),
            ..ListingParams::default()
        };
        let query = BookQuery::from_params(&params).unwrap();

        let books = store
            .find_books(&query.filter, query.sort, query.limit)
            .await
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Mistborn");
    }

    #[tokio::test]
    async fn test_default_sort_is_insertion_order() {
        let store = seeded().await;
        let sort = BookSort {
            field: SortField::Id,
            direction: SortDirection::Asc,
        };
        let books = store
            .find_books(&BookFilter::default(), sort, Limit::default())
            .await
            .unwrap();

        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["The Hobbit", "Dune", "Mistborn"]);
        assert_eq!(store.count_books().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing_books() {
        let store = seeded().await;
        let missing = BookId::generate();
        let body = draft(json!({"title": "X", "author": "Y"}));

        assert!(!store.update_book(missing, body.clone()).await.unwrap());
        assert!(!store.delete_book(missing).await.unwrap());

        let book = store.insert_book(body.clone()).await.unwrap();
        assert!(store.update_book(book.id, draft(json!({"title": "Z", "author": "Y"}))).await.unwrap());
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().title, "Z");
        assert!(store.delete_book(book.id).await.unwrap());
        assert!(store.find_book(book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_favorites_upsert_and_pull() {
        let store = InMemoryStore::new();
        let user = UserId::generate();
        let book = BookId::generate();

        assert!(store.favorites_for(user).await.unwrap().is_empty());
        store.pull_favorite(user, book).await.unwrap();

        store
            .push_favorite(user, FavoriteEntry::new(book, Utc::now()))
            .await
            .unwrap();
        store
            .push_favorite(user, FavoriteEntry::new(book, Utc::now()))
            .await
            .unwrap();
        assert_eq!(store.favorites_for(user).await.unwrap().len(), 2);

        store.pull_favorite(user, book).await.unwrap();
        assert!(store.favorites_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_are_scoped_per_user() {
        let store = InMemoryStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();
        let book = BookId::generate();

        store
            .push_favorite(alice, FavoriteEntry::new(book, Utc::now()))
            .await
            .unwrap();
        store.pull_favorite(bob, book).await.unwrap();

        assert_eq!(store.favorites_for(alice).await.unwrap().len(), 1);
        assert!(store.favorites_for(bob).await.unwrap().is_empty());
    }
}
