//! Catalog queries.
//!
//! Listing compiles a [`BookFilter`] into a `WHERE` clause. The compiled SQL
//! must select and order exactly what `BookFilter::matches` and
//! `BookSort::compare` would in memory:
//!
//! - substring matches use `strpos(lower(..), lower(..))`, a literal match
//! - text sorts use the `"C"` collation (byte order, like `str::cmp`)
//! - ascending puts nulls first, descending puts them last
//! - ties always fall back to `id ASC`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use readieg_core::query::{BookFilter, BookSort, Limit, Predicate, SortDirection, SortField};
use readieg_core::{Book, BookDraft, BookId};

use super::PgStore;
use crate::db::{BookRepository, RepositoryError};

const BOOK_COLUMNS: &str = "id, title, author, description, series, series_number, tags, \
                            year, rating, pages, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    author: String,
    description: String,
    series: String,
    series_number: Option<f64>,
    tags: Vec<String>,
    year: Option<i32>,
    rating: Option<f64>,
    pages: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: BookId::from(row.id),
            title: row.title,
            author: row.author,
            description: row.description,
            series: row.series,
            series_number: row.series_number,
            tags: row.tags,
            year: row.year,
            rating: row.rating,
            pages: row.pages,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Append the `WHERE` clause for `filter`, if it has any predicates.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    for (i, predicate) in filter.predicates().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });

        match predicate {
            Predicate::Contains { field, needle } => {
                qb.push("strpos(lower(")
                    .push(field.column())
                    .push("), lower(")
                    .push_bind(needle.clone())
                    .push(")) > 0");
            }
            Predicate::HasTag(tag) => {
                qb.push_bind(tag.clone()).push(" = ANY(tags)");
            }
            Predicate::Range { field, min, max } => {
                let column = field.column();
                qb.push("(").push(column).push(" IS NOT NULL");
                if let Some(min) = min {
                    qb.push(" AND ")
                        .push(column)
                        .push("::float8 >= ")
                        .push_bind(*min);
                }
                if let Some(max) = max {
                    qb.push(" AND ")
                        .push(column)
                        .push("::float8 <= ")
                        .push_bind(*max);
                }
                qb.push(")");
            }
        }
    }
}

/// Append the `ORDER BY` clause for `sort`.
fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: BookSort) {
    qb.push(" ORDER BY ");

    if sort.field != SortField::Id {
        qb.push(sort.field.column());
        if matches!(sort.field, SortField::Title | SortField::Author) {
            qb.push(r#" COLLATE "C""#);
        }
        qb.push(match sort.direction {
            SortDirection::Asc => " ASC NULLS FIRST, ",
            SortDirection::Desc => " DESC NULLS LAST, ",
        });
    }

    qb.push("id ASC");
}

/// Build the full listing statement.
fn listing_query(filter: &BookFilter, sort: BookSort, limit: Limit) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(BOOK_COLUMNS).push(" FROM books");
    push_filter(&mut qb, filter);
    push_order(&mut qb, sort);
    qb.push(" LIMIT ").push_bind(i64::from(limit.get()));
    qb
}

#[async_trait]
impl BookRepository for PgStore {
    async fn find_books(
        &self,
        filter: &BookFilter,
        sort: BookSort,
        limit: Limit,
    ) -> Result<Vec<Book>, RepositoryError> {
        let mut qb = listing_query(filter, sort, limit);
        let rows = qb
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    async fn find_books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = ids.iter().map(BookId::as_uuid).collect();
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn insert_book(&self, draft: BookDraft) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            r"
            INSERT INTO books (id, title, author, description, series, series_number,
                               tags, year, rating, pages)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {BOOK_COLUMNS}
            "
        ))
        .bind(BookId::generate().as_uuid())
        .bind(draft.title)
        .bind(draft.author)
        .bind(draft.description)
        .bind(draft.series)
        .bind(draft.series_number)
        .bind(draft.tags)
        .bind(draft.year)
        .bind(draft.rating)
        .bind(draft.pages)
        .fetch_one(&self.pool)
        .await?;

        Ok(Book::from(row))
    }

    async fn update_book(&self, id: BookId, draft: BookDraft) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE books
            SET title = $2, author = $3, description = $4, series = $5,
                series_number = $6, tags = $7, year = $8, rating = $9, pages = $10,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .bind(draft.title)
        .bind(draft.author)
        .bind(draft.description)
        .bind(draft.series)
        .bind(draft.series_number)
        .bind(draft.tags)
        .bind(draft.year)
        .bind(draft.rating)
        .bind(draft.pages)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_book(&self, id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_books(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative book count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use readieg_core::{BookQuery, ListingParams};

    use super::*;

    fn sql_for(params: &ListingParams) -> String {
        let Ok(query) = BookQuery::from_params(params) else {
            panic!("params should be valid");
        };
        listing_query(&query.filter, query.sort, query.limit)
            .sql()
            .to_owned()
    }

    #[test]
    fn test_unfiltered_listing_orders_by_id() {
        let sql = sql_for(&ListingParams::default());
        assert!(sql.ends_with("FROM books ORDER BY id ASC LIMIT $1"), "{sql}");
    }

    #[test]
    fn test_every_predicate_is_bound_not_inlined() {
        let params = ListingParams {
            author: Some("tolkien'; DROP TABLE books; --".to_owned()),
            series: Some("Middle".to_owned()),
            tag: Some("fantasy".to_owned()),
            min_rating: Some("4".to_owned()),
            year_from: Some("1900".to_owned()),
            year_to: Some("2000".to_owned()),
            ..ListingParams::default()
        };
        let sql = sql_for(&params);

        assert!(!sql.contains("DROP"));
        assert!(sql.contains("strpos(lower(author), lower($1)) > 0"), "{sql}");
        assert!(sql.contains("strpos(lower(series), lower($2)) > 0"), "{sql}");
        assert!(sql.contains("$3 = ANY(tags)"), "{sql}");
        assert!(sql.contains("(rating IS NOT NULL AND rating::float8 >= $4)"), "{sql}");
        assert!(
            sql.contains("(year IS NOT NULL AND year::float8 >= $5 AND year::float8 <= $6)"),
            "{sql}"
        );
        assert!(sql.ends_with("LIMIT $7"), "{sql}");
    }

    #[test]
    fn test_sort_direction_controls_null_placement() {
        let asc = sql_for(&ListingParams {
            sort: Some("rating".to_owned()),
            ..ListingParams::default()
        });
        assert!(asc.contains("ORDER BY rating ASC NULLS FIRST, id ASC"), "{asc}");

        let desc = sql_for(&ListingParams {
            sort: Some("title:DESC".to_owned()),
            ..ListingParams::default()
        });
        assert!(
            desc.contains(r#"ORDER BY title COLLATE "C" DESC NULLS LAST, id ASC"#),
            "{desc}"
        );
    }

    #[test]
    fn test_created_at_sort_uses_column_name() {
        let sql = sql_for(&ListingParams {
            sort: Some("createdAt:desc".to_owned()),
            ..ListingParams::default()
        });
        assert!(sql.contains("ORDER BY created_at DESC NULLS LAST, id ASC"), "{sql}");
    }
}
