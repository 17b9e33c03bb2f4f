//! Seed the catalog with sample books.
//!
//! Reads a YAML list of books (same shape as the create-book API body),
//! validates every entry before connecting, and inserts them unless the
//! catalog already holds at least that many books.

use std::path::Path;

use readieg_core::{BookDraft, BookPayload};
use readieg_server::db::{self, BookRepository, PgStore, Store};

use super::{CommandError, database_url};

/// Sample catalog shipped with the repository.
pub const DEFAULT_FILE: &str = "crates/cli/data/books.yaml";

/// Parse and validate a seed file.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or any book fails validation.
pub fn parse_catalog(content: &str) -> Result<Vec<BookDraft>, CommandError> {
    let payloads: Vec<BookPayload> = serde_yaml::from_str(content)?;

    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            BookDraft::try_from(payload).map_err(|source| CommandError::InvalidBook {
                index: index + 1,
                source,
            })
        })
        .collect()
}

/// Seed books from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn books(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    tracing::info!(path = %file_path, "Loading books from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let drafts = parse_catalog(&content)?;
    tracing::info!(books = drafts.len(), "Parsed seed file");

    let database_url = database_url()?;
    let store = PgStore::new(db::create_pool(&database_url).await?);

    let existing = store.count_books().await?;
    if existing >= drafts.len() as u64 {
        tracing::info!(existing, "Catalog already populated, skipping seed");
        store.close().await;
        return Ok(());
    }

    let total = drafts.len();
    for draft in drafts {
        store.insert_book(draft).await?;
    }

    tracing::info!(inserted = total, "Seeded books");
    store.close().await;
    Ok(())
}
