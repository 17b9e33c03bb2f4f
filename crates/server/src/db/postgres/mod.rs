//! `PostgreSQL` storage engine.
//!
//! Queries are built at runtime (`sqlx::query_as` and `QueryBuilder`) with
//! bound parameters only; no user input is ever spliced into SQL text.

mod books;
mod favorites;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

use super::{RepositoryError, Store};

/// Schema migrations for the catalog, accounts and favorites.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Storage engine backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool (shared with the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
