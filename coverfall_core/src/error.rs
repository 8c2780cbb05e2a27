//! Error types for the cover resolution library
//!
//! This module contains all error types used throughout the library, organized
//! into logical categories for better maintainability and clarity.

use thiserror::Error;

pub mod internal;
pub mod network;
pub mod validation;

pub use self::internal::InternalError;
pub use self::network::NetworkError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cover resolution library
///
/// Errors are categorized into three main types:
/// - Network errors: HTTP transport, timeouts, and remote API failures
/// - Validation errors: Input validation and configuration errors
/// - Internal errors: Library internal errors (cache accounting, serialization)
///
/// Note that [`crate::resolver::CoverResolver::resolve`] itself never returns
/// an error: every probe failure is absorbed by advancing to the next
/// candidate. These types cover the fallible edges (client construction,
/// remote lookups, configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// Network related errors
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

// Conversions from external error types

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Self::Network(NetworkError::from_reqwest(source))
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal(InternalError::serialization(source.to_string()))
    }
}
