//! Business services used by the HTTP handlers.

pub mod accounts;

pub use accounts::AccountService;
