//! Core entity definitions for the recipe API.
//!
//! This crate defines the data types shared by the store, the auth layer and
//! the HTTP server: users, per-user tags and per-user recipes.

mod recipe;
mod tag;
mod user;

pub use recipe::*;
pub use tag::*;
pub use user::*;

/// Maximum length of short text columns (titles, names, links).
pub const MAX_TEXT_LENGTH: usize = 255;
