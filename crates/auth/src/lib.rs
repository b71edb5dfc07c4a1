//! Authentication primitives for the recipe API.
//!
//! This crate provides:
//! - Argon2 password hashing and verification
//! - JWT bearer token generation and validation

mod error;
mod jwt;
mod password;

pub use error::*;
pub use jwt::*;
pub use password::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "recipe-api";
