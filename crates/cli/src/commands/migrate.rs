//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! readieg-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `READIEG_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Table migrations live in `crates/server/migrations/`. The session table is
//! created by `tower-sessions-sqlx-store` in its own `tower_sessions` schema.

use tower_sessions_sqlx_store::PostgresStore;

use readieg_server::db;

use super::{CommandError, database_url};

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running schema migrations...");
    db::postgres::MIGRATOR.run(&pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool.clone()).migrate().await?;

    pool.close().await;
    tracing::info!("Migrations complete!");
    Ok(())
}
