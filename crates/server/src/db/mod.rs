//! Storage for identities, the catalog and favorites.
//!
//! Every engine implements the repository traits below and is handed to the
//! application as one `Arc<dyn Store>` built at startup.
//!
//! # Engines
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`InMemoryStore`] - process-local maps (development and tests)
//!
//! # Tables (`PostgreSQL`)
//!
//! - `users` - Accounts; email is unique and stored lowercased
//! - `books` - The catalog
//! - `favorites` - One row per user holding a JSONB array of `{bookId, addedAt}`
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p readieg-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use readieg_core::query::{BookFilter, BookSort, Limit};
use readieg_core::{Book, BookDraft, BookId, Email, FavoriteEntry, UserId};

use crate::models::user::User;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Look up an account together with its password hash.
    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// The book catalog.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching `filter`, ordered by `sort`, at most `limit` of them.
    async fn find_books(
        &self,
        filter: &BookFilter,
        sort: BookSort,
        limit: Limit,
    ) -> Result<Vec<Book>, RepositoryError>;

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError>;

    /// Batch lookup. Missing ids are skipped; order is unspecified.
    async fn find_books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError>;

    async fn insert_book(&self, draft: BookDraft) -> Result<Book, RepositoryError>;

    /// Overwrite a book's fields. Returns `false` if no such book exists.
    async fn update_book(&self, id: BookId, draft: BookDraft) -> Result<bool, RepositoryError>;

    /// Returns `false` if no such book exists.
    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError>;

    async fn count_books(&self) -> Result<u64, RepositoryError>;
}

/// Per-user favorites lists.
///
/// Each mutation is a single atomic operation on one user's list.
#[async_trait]
pub trait FavoritesRepository: Send + Sync {
    /// The user's entries in insertion order; empty when no list exists yet.
    async fn favorites_for(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError>;

    /// Append an entry, creating the list if absent.
    async fn push_favorite(
        &self,
        user_id: UserId,
        entry: FavoriteEntry,
    ) -> Result<(), RepositoryError>;

    /// Remove every entry for `book_id`. Missing lists and entries are not an error.
    async fn pull_favorite(&self, user_id: UserId, book_id: BookId)
    -> Result<(), RepositoryError>;
}

/// A complete storage engine.
#[async_trait]
pub trait Store: UserRepository + BookRepository + FavoritesRepository {
    /// Verify the backing storage is reachable.
    async fn health_check(&self) -> Result<(), RepositoryError>;

    /// Release connections. Called once at shutdown.
    async fn close(&self);
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
