//! Readieg Core - Domain library for the library catalog.
//!
//! This crate holds everything about books, users and favorites that can be
//! expressed without touching a database or the network:
//! - `server` - HTTP API built on axum (uses these types end to end)
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Storage engines compile or evaluate the queries
//! defined here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails
//! - [`book`] - The `Book` record and validation of incoming book payloads
//! - [`query`] - Listing parameters turned into a validated filter, sort, projection and limit
//! - [`favorites`] - Per-user favorites aggregate and its inner-join resolver

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod book;
pub mod favorites;
pub mod query;
pub mod types;

pub use book::{Book, BookDraft, BookError, BookPayload};
pub use favorites::{FavoriteBook, FavoriteEntry, Favorites, ResolvedFavorite, resolve};
pub use query::{BookQuery, ListingParams, QueryError};
pub use types::*;
