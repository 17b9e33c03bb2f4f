//! Domain models for the server.
//!
//! Catalog and favorites types live in `readieg_core`; this module holds the
//! account and session types that only the server needs.

pub mod session;
pub mod user;

pub use session::CurrentUser;
pub use user::User;
