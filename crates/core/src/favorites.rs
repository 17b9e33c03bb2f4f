//! Per-user favorites aggregate.
//!
//! Each user owns one ordered list of `{bookId, addedAt}` references. The list
//! may hold the same book more than once; removing a book drops every entry
//! for it. Resolving the list against the catalog is an inner join: entries
//! whose book no longer exists produce no row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Book, BookId, UserId};

/// One reference in a favorites list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub book_id: BookId,
    pub added_at: DateTime<Utc>,
}

impl FavoriteEntry {
    #[must_use]
    pub const fn new(book_id: BookId, added_at: DateTime<Utc>) -> Self {
        Self { book_id, added_at }
    }
}

/// A user's favorites document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorites {
    pub user_id: UserId,
    pub books: Vec<FavoriteEntry>,
}

impl Favorites {
    /// An empty list, as created on first add.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            books: Vec::new(),
        }
    }

    /// Append an entry. Duplicates are kept.
    pub fn push(&mut self, entry: FavoriteEntry) {
        self.books.push(entry);
    }

    /// Remove every entry referencing `book_id`, preserving the order of the rest.
    ///
    /// Returns how many entries were removed.
    pub fn remove_all(&mut self, book_id: BookId) -> usize {
        let before = self.books.len();
        self.books.retain(|e| e.book_id != book_id);
        before - self.books.len()
    }
}

/// Distinct book ids referenced by `entries`, in first-seen order.
#[must_use]
pub fn distinct_book_ids(entries: &[FavoriteEntry]) -> Vec<BookId> {
    let mut ids: Vec<BookId> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !ids.contains(&entry.book_id) {
            ids.push(entry.book_id);
        }
    }
    ids
}

/// The book summary embedded in a resolved favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteBook {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub tags: Vec<String>,
}

impl From<&Book> for FavoriteBook {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            rating: book.rating,
            tags: book.tags.clone(),
        }
    }
}

/// One row of the resolved favorites listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFavorite {
    pub added_at: DateTime<Utc>,
    pub book: FavoriteBook,
}

/// Join favorites entries with the books they reference.
///
/// Produces one row per entry whose book is present in `books`, in entry
/// order. Entries for missing books are dropped.
#[must_use]
pub fn resolve(entries: &[FavoriteEntry], books: &[Book]) -> Vec<ResolvedFavorite> {
    let by_id: HashMap<BookId, &Book> = books.iter().map(|b| (b.id, b)).collect();

    entries
        .iter()
        .filter_map(|entry| {
            by_id.get(&entry.book_id).map(|book| ResolvedFavorite {
                added_at: entry.added_at,
                book: FavoriteBook::from(*book),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::BookDraft;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn book(title: &str) -> Book {
        let draft = BookDraft {
            title: title.to_owned(),
            author: "Someone".to_owned(),
            description: String::new(),
            series: String::new(),
            series_number: None,
            tags: vec!["tag".to_owned()],
            year: Some(2000),
            rating: Some(4.0),
            pages: Some(100),
        };
        Book::from_draft(BookId::generate(), draft, at(0))
    }

    #[test]
    fn test_push_keeps_duplicates_in_order() {
        let id = BookId::generate();
        let mut favs = Favorites::empty(UserId::generate());
        favs.push(FavoriteEntry::new(id, at(1)));
        favs.push(FavoriteEntry::new(id, at(2)));

        assert_eq!(favs.books.len(), 2);
        assert_eq!(favs.books[0].added_at, at(1));
        assert_eq!(distinct_book_ids(&favs.books), vec![id]);
    }

    #[test]
    fn test_remove_all_drops_every_match() {
        let a = BookId::generate();
        let b = BookId::generate();
        let mut favs = Favorites::empty(UserId::generate());
        favs.push(FavoriteEntry::new(a, at(1)));
        favs.push(FavoriteEntry::new(b, at(2)));
        favs.push(FavoriteEntry::new(a, at(3)));

        assert_eq!(favs.remove_all(a), 2);
        assert_eq!(favs.books, vec![FavoriteEntry::new(b, at(2))]);
        assert_eq!(favs.remove_all(a), 0);
    }

    #[test]
    fn test_add_then_remove_restores_prior_state() {
        let kept = BookId::generate();
        let mut favs = Favorites::empty(UserId::generate());
        favs.push(FavoriteEntry::new(kept, at(1)));
        let before = favs.clone();

        let added = BookId::generate();
        favs.push(FavoriteEntry::new(added, at(2)));
        favs.remove_all(added);

        assert_eq!(favs, before);
    }

    #[test]
    fn test_resolve_is_an_inner_join_in_entry_order() {
        let hobbit = book("The Hobbit");
        let dune = book("Dune");
        let gone = BookId::generate();
        let entries = vec![
            FavoriteEntry::new(dune.id, at(1)),
            FavoriteEntry::new(gone, at(2)),
            FavoriteEntry::new(hobbit.id, at(3)),
            FavoriteEntry::new(dune.id, at(4)),
        ];

        let rows = resolve(&entries, &[hobbit.clone(), dune.clone()]);

        let titles: Vec<_> = rows.iter().map(|r| r.book.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "The Hobbit", "Dune"]);
        assert_eq!(rows[1].added_at, at(3));
        assert_eq!(rows[1].book.id, hobbit.id);
    }

    #[test]
    fn test_resolved_row_shape() {
        let hobbit = book("The Hobbit");
        let rows = resolve(&[FavoriteEntry::new(hobbit.id, at(5))], &[hobbit]);
        let value = serde_json::to_value(&rows[0]).unwrap();

        assert!(value.get("addedAt").is_some());
        let book = value["book"].as_object().unwrap();
        let mut keys: Vec<_> = book.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["author", "id", "rating", "tags", "title", "year"]);
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = FavoriteEntry::new(BookId::generate(), at(0));
        let value = serde_json::to_value(entry).unwrap();
        assert_eq!(value["bookId"], serde_json::Value::from(entry.book_id.to_string()));
        let back: FavoriteEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
