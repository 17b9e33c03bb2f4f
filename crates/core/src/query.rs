//! Query Builder for catalog listings.
//!
//! Raw listing parameters (`author`, `series`, `tag`, `minRating`, `yearFrom`,
//! `yearTo`, `sort`, `fields`, `limit`) are validated here and turned into a
//! [`BookQuery`]: a filter made of typed predicates, a sort order, an optional
//! projection and a bounded limit.
//!
//! The filter is engine-neutral. The in-memory store evaluates it with
//! [`BookFilter::matches`] and [`BookSort::compare`]; the `PostgreSQL` store
//! compiles the same predicates to SQL. Both must produce the same rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Book;

/// Default number of books returned when `limit` is not given.
pub const DEFAULT_LIMIT: u16 = 50;

/// Largest accepted `limit`.
pub const MAX_LIMIT: u16 = 200;

/// Invalid listing parameter.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid minRating")]
    InvalidMinRating,

    #[error("Invalid yearFrom/yearTo")]
    InvalidYearRange,

    #[error("Invalid limit (1..200)")]
    InvalidLimit,
}

/// Listing parameters exactly as they appear in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub author: Option<String>,
    pub series: Option<String>,
    pub tag: Option<String>,
    pub min_rating: Option<String>,
    pub year_from: Option<String>,
    pub year_to: Option<String>,
    pub sort: Option<String>,
    pub fields: Option<String>,
    pub limit: Option<String>,
}

// =============================================================================
// Filter
// =============================================================================

/// Free-text fields that support substring matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Author,
    Series,
}

impl TextField {
    /// Column name in relational storage.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Series => "series",
        }
    }

    fn value(self, book: &Book) -> &str {
        match self {
            Self::Author => &book.author,
            Self::Series => &book.series,
        }
    }
}

/// Numeric fields that support range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Rating,
    Year,
}

impl NumericField {
    /// Column name in relational storage.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Year => "year",
        }
    }

    fn value(self, book: &Book) -> Option<f64> {
        match self {
            Self::Rating => book.rating,
            Self::Year => book.year.map(f64::from),
        }
    }
}

/// A single typed condition on a book.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive literal substring match.
    Contains { field: TextField, needle: String },
    /// Exact membership in the book's tags.
    HasTag(String),
    /// Inclusive numeric bounds. A book with no value never matches.
    Range {
        field: NumericField,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Predicate {
    /// Evaluate the predicate against a book.
    #[must_use]
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Self::Contains { field, needle } => field
                .value(book)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::HasTag(tag) => book.tags.iter().any(|t| t == tag),
            Self::Range { field, min, max } => field.value(book).is_some_and(|v| {
                min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi)
            }),
        }
    }
}

/// Conjunction of predicates. An empty filter matches every book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    predicates: Vec<Predicate>,
}

impl BookFilter {
    /// Add a predicate to the conjunction.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// The predicates, in the order they were added.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether every predicate holds for the book.
    #[must_use]
    pub fn matches(&self, book: &Book) -> bool {
        self.predicates.iter().all(|p| p.matches(book))
    }
}

// =============================================================================
// Sort
// =============================================================================

/// Sortable fields. `Id` is the creation-order fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    Author,
    Year,
    Rating,
    CreatedAt,
    #[default]
    Id,
}

impl SortField {
    /// Column name in relational storage.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Rating => "rating",
            Self::CreatedAt => "created_at",
            Self::Id => "id",
        }
    }

    fn from_param(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "year" => Some(Self::Year),
            "rating" => Some(Self::Rating),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort order for a listing.
///
/// Missing values order before present ones when ascending. Ties are broken
/// by id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl BookSort {
    /// Parse `field[:direction]`.
    ///
    /// Unknown fields fall back to creation order, ascending.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(2, ':');
        let field = parts.next().map(str::trim).and_then(SortField::from_param);
        let Some(field) = field else {
            return Self::default();
        };

        let direction = match parts.next() {
            Some(dir) if dir.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        Self { field, direction }
    }

    /// Total order over books consistent with this sort.
    #[must_use]
    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let primary = match self.field {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Author => a.author.cmp(&b.author),
            SortField::Year => a.year.cmp(&b.year),
            SortField::Rating => compare_optional_f64(a.rating, b.rating),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Id => Ordering::Equal,
        };

        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };

        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_optional_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Fields a caller may ask for via `fields=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BookField {
    Title,
    Author,
    Description,
    Series,
    SeriesNumber,
    Tags,
    Year,
    Rating,
    Pages,
    CreatedAt,
}

impl BookField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Description => "description",
            Self::Series => "series",
            Self::SeriesNumber => "seriesNumber",
            Self::Tags => "tags",
            Self::Year => "year",
            Self::Rating => "rating",
            Self::Pages => "pages",
            Self::CreatedAt => "createdAt",
        }
    }

    fn from_param(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Self::Title,
            "author" => Self::Author,
            "description" => Self::Description,
            "series" => Self::Series,
            "seriesNumber" => Self::SeriesNumber,
            "tags" => Self::Tags,
            "year" => Self::Year,
            "rating" => Self::Rating,
            "pages" => Self::Pages,
            "createdAt" => Self::CreatedAt,
            _ => return None,
        })
    }

    fn value(self, book: &Book) -> Value {
        match self {
            Self::Title => Value::from(book.title.clone()),
            Self::Author => Value::from(book.author.clone()),
            Self::Description => Value::from(book.description.clone()),
            Self::Series => Value::from(book.series.clone()),
            Self::SeriesNumber => book.series_number.map_or(Value::Null, Value::from),
            Self::Tags => Value::from(book.tags.clone()),
            Self::Year => book.year.map_or(Value::Null, Value::from),
            Self::Rating => book.rating.map_or(Value::Null, Value::from),
            Self::Pages => book.pages.map_or(Value::Null, Value::from),
            Self::CreatedAt => Value::from(book.created_at.to_rfc3339()),
        }
    }
}

/// Non-empty allow-listed subset of book fields. `id` is always emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<BookField>,
}

impl Projection {
    /// Parse a comma-separated field list.
    ///
    /// Unknown names are dropped. Returns `None` when nothing usable remains,
    /// meaning the full record should be returned.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut fields = Vec::new();
        for field in raw.split(',').map(str::trim).filter_map(BookField::from_param) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    /// Project a book down to `id` plus the selected fields.
    #[must_use]
    pub fn apply(&self, book: &Book) -> Map<String, Value> {
        let mut out = Map::with_capacity(self.fields.len() + 1);
        out.insert("id".to_owned(), Value::from(book.id.to_string()));
        for field in &self.fields {
            out.insert(field.as_str().to_owned(), field.value(book));
        }
        out
    }
}

// =============================================================================
// Limit
// =============================================================================

/// Result size bound, always within `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(u16);

impl Limit {
    /// Parse a limit parameter.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidLimit` if the value is not an integer in range.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let n = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidLimit)?;
        u16::try_from(n)
            .ok()
            .filter(|n| (1..=MAX_LIMIT).contains(n))
            .map(Self)
            .ok_or(QueryError::InvalidLimit)
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

// =============================================================================
// Query
// =============================================================================

/// Fully validated listing query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub filter: BookFilter,
    pub sort: BookSort,
    pub projection: Option<Projection>,
    pub limit: Limit,
}

impl BookQuery {
    /// Validate raw parameters into a query.
    ///
    /// # Errors
    ///
    /// Returns the first `QueryError` found, checking `minRating`, then the
    /// year range, then `limit`.
    pub fn from_params(params: &ListingParams) -> Result<Self, QueryError> {
        let mut filter = BookFilter::default();

        if let Some(author) = non_empty(params.author.as_deref()) {
            filter = filter.and(Predicate::Contains {
                field: TextField::Author,
                needle: author.to_owned(),
            });
        }
        if let Some(series) = non_empty(params.series.as_deref()) {
            filter = filter.and(Predicate::Contains {
                field: TextField::Series,
                needle: series.to_owned(),
            });
        }
        if let Some(tag) = non_empty(params.tag.as_deref()) {
            filter = filter.and(Predicate::HasTag(tag.to_owned()));
        }

        if let Some(raw) = params.min_rating.as_deref() {
            let min = parse_number(raw).ok_or(QueryError::InvalidMinRating)?;
            filter = filter.and(Predicate::Range {
                field: NumericField::Rating,
                min: Some(min),
                max: None,
            });
        }

        if params.year_from.is_some() || params.year_to.is_some() {
            let min = params
                .year_from
                .as_deref()
                .map(|raw| parse_number(raw).ok_or(QueryError::InvalidYearRange))
                .transpose()?;
            let max = params
                .year_to
                .as_deref()
                .map(|raw| parse_number(raw).ok_or(QueryError::InvalidYearRange))
                .transpose()?;
            filter = filter.and(Predicate::Range {
                field: NumericField::Year,
                min,
                max,
            });
        }

        let sort = params
            .sort
            .as_deref()
            .map(BookSort::parse)
            .unwrap_or_default();
        let projection = params.fields.as_deref().and_then(Projection::parse);
        let limit = params
            .limit
            .as_deref()
            .map(Limit::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            filter,
            sort,
            projection,
            limit,
        })
    }
}

/// Filter, sort and truncate an in-memory collection of books.
///
/// Storage engines without a query language of their own use this.
#[must_use]
pub fn select_books<'a, I>(
    books: I,
    filter: &BookFilter,
    sort: BookSort,
    limit: Limit,
) -> Vec<Book>
where
    I: IntoIterator<Item = &'a Book>,
{
    let mut hits: Vec<&Book> = books.into_iter().filter(|b| filter.matches(b)).collect();
    hits.sort_by(|a, b| sort.compare(a, b));
    hits.into_iter()
        .take(usize::from(limit.get()))
        .cloned()
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
