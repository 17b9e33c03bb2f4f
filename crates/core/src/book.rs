//! Book records and validation of incoming book payloads.
//!
//! A [`BookPayload`] is whatever the client sent; a [`BookDraft`] is the
//! validated, normalized form that storage engines accept. Numeric fields are
//! coerced at this boundary and rejected when they are not numbers, so no
//! `NaN` or half-parsed value ever reaches a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BookId;

/// Errors raised while validating a book payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// `title` or `author` missing or blank.
    #[error("Missing required fields: title, author")]
    MissingRequired,

    /// A numeric field could not be coerced.
    #[error("Invalid {field}")]
    InvalidNumber {
        /// Wire name of the offending field.
        field: &'static str,
    },
}

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub series: String,
    pub series_number: Option<f64>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub pages: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new record from a validated draft.
    #[must_use]
    pub fn from_draft(id: BookId, draft: BookDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            author: draft.author,
            description: draft.description,
            series: draft.series,
            series_number: draft.series_number,
            tags: draft.tags,
            year: draft.year,
            rating: draft.rating,
            pages: draft.pages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every mutable field with the draft, keeping `id` and `created_at`.
    pub fn apply(&mut self, draft: BookDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }
}

/// A numeric field as it may arrive over the wire.
///
/// Clients send either JSON numbers or the string contents of a form field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

/// Raw create/update body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub series: Option<String>,
    pub series_number: Option<NumberInput>,
    pub tags: Option<Value>,
    pub year: Option<NumberInput>,
    pub rating: Option<NumberInput>,
    pub pages: Option<NumberInput>,
}

/// A validated book ready to be inserted or written over an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub series: String,
    pub series_number: Option<f64>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub pages: Option<i32>,
}

impl TryFrom<BookPayload> for BookDraft {
    type Error = BookError;

    fn try_from(payload: BookPayload) -> Result<Self, Self::Error> {
        let title = required_text(payload.title)?;
        let author = required_text(payload.author)?;

        Ok(Self {
            title,
            author,
            description: payload.description.unwrap_or_default(),
            series: payload.series.unwrap_or_default(),
            series_number: coerce_number(payload.series_number, "seriesNumber")?,
            tags: normalize_tags(payload.tags),
            year: coerce_integer(payload.year, "year")?,
            rating: coerce_number(payload.rating, "rating")?,
            pages: coerce_integer(payload.pages, "pages")?,
        })
    }
}

fn required_text(value: Option<String>) -> Result<String, BookError> {
    let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(BookError::MissingRequired);
    }
    Ok(trimmed.to_owned())
}

fn coerce_number(
    value: Option<NumberInput>,
    field: &'static str,
) -> Result<Option<f64>, BookError> {
    let number = match value {
        None => return Ok(None),
        Some(NumberInput::Number(n)) => n,
        Some(NumberInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .map_err(|_| BookError::InvalidNumber { field })?
        }
    };

    if number.is_finite() {
        Ok(Some(number))
    } else {
        Err(BookError::InvalidNumber { field })
    }
}

fn coerce_integer(
    value: Option<NumberInput>,
    field: &'static str,
) -> Result<Option<i32>, BookError> {
    let Some(number) = coerce_number(value, field)? else {
        return Ok(None);
    };

    if number.fract() != 0.0 || number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
        return Err(BookError::InvalidNumber { field });
    }

    #[allow(clippy::cast_possible_truncation)] // integral and range-checked above
    Ok(Some(number as i32))
}

/// Tags behave like a set that remembers insertion order.
fn normalize_tags(value: Option<Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let tag = match item {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
