//! Error types for cache operations.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the cache facade and its stores.
///
/// Remote failures are not classified further: a refused connection, a
/// timeout and an auth failure all surface as [`Error::Backend`], and the
/// facade wraps them into [`Error::Operation`] for fail-closed operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A facade operation failed. `message` is already formatted as
    /// `"Cache <operation> operation failed: <cause>"`.
    #[error("{message}")]
    Operation {
        operation: String,
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// The key-value store rejected or failed a command.
    #[error("{command} failed: {message}")]
    Backend { command: String, message: String },

    /// A value could not be encoded to, or decoded from, its stored text.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input supplied by the caller (e.g. an empty key).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn backend(command: &str, message: impl Into<String>) -> Self {
        Error::Backend {
            command: command.to_string(),
            message: message.into(),
        }
    }

    /// Name of the facade operation, if this is an operation error.
    pub fn operation(&self) -> Option<&str> {
        match self {
            Error::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
