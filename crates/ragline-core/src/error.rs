//! Error types for ragline.

use thiserror::Error;

/// Result type alias using ragline's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ragline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid caller input (empty query, zero top_k)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A backend (vector store, lexical engine, cache) could not serve the call
    #[error("Backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        backend: &'static str,
        message: String,
    },

    /// The lexical index or vector collection does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// A backend call exceeded its deadline
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Fallback index could not be built
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::BackendUnavailable`].
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            backend,
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault and must be reported back.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Request(format!("timeout: {}", e))
        } else {
            Error::Request(e.to_string())
        }
    }
}
