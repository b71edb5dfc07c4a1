//! Storage for the recipe API.
//!
//! This crate provides owner-scoped repository traits for users, tags and
//! recipes, an in-memory implementation used in tests and development, and a
//! PostgreSQL implementation with explicit migrations.

mod error;
mod memory;
mod migrations;
mod postgres;
mod readiness;
mod schema;
mod traits;

pub use error::*;
pub use memory::*;
pub use migrations::*;
pub use postgres::*;
pub use readiness::*;
pub use traits::*;

/// Re-exported for callers that inspect database errors.
pub use sqlx;
