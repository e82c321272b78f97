//! Core types and error handling.
//!
//! - [`UpdateError`] - the error kinds an update cycle can fail with
//! - [`ErrorContext`] - an error plus suggestion/details for display
//! - [`user_friendly_error`] - recover the typed kind from an [`anyhow::Error`]

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
