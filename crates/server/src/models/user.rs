//! User domain types.
//!
//! The password hash never lives on [`User`]; repositories hand it out
//! separately so it cannot end up in a response by accident.

use chrono::{DateTime, Utc};
use serde::Serialize;

use readieg_core::{Email, UserId};

/// A registered account, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, lowercased.
    pub email: Email,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}
