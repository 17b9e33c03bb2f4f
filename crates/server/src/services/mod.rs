//! Business logic services.
//!
//! Services borrow the store for the length of one request and hold no state
//! of their own.
//!
//! # Services
//!
//! - `auth` - Account creation and password login
//! - `catalog` - Book listing, lookup and maintenance
//! - `favorites` - Per-user favorites lists and their resolution against the catalog

pub mod auth;
pub mod catalog;
pub mod favorites;

pub use auth::{AuthError, AuthService};
pub use catalog::{BookView, CatalogService};
pub use favorites::FavoritesService;
