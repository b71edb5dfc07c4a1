//! HTTP payload definitions for the recipe API
//!
//! This crate defines the JSON request and response bodies exchanged with
//! clients, their field-level validation, and the structured error body.

mod error;
mod requests;
mod responses;

pub use error::*;
pub use requests::*;
pub use responses::*;
