//! Core error types.

use thiserror::Error;

/// Errors raised by traversal, query compilation and backend access.
#[derive(Debug, Error)]
pub enum Error {
    /// A predicate cannot be translated into the backend's query language.
    #[error("cannot compile predicate '{predicate}': {reason}")]
    Compile { predicate: String, reason: String },

    /// The backend call failed outright.
    #[error("transport error: {0}")]
    Transport(String),

    /// The operation is not available on a read-only graph.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// A predicate cannot be evaluated locally.
    #[error("invalid predicate '{predicate}': {reason}")]
    InvalidPredicate { predicate: String, reason: String },

    /// A backend document could not be turned into an element.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] fathom_proto::Error),
}

impl Error {
    /// Build an [`Error::Unsupported`] naming `operation`.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Error::Unsupported {
            operation: operation.into(),
        }
    }

    /// Build an [`Error::Compile`] for `predicate`.
    pub fn compile(predicate: impl ToString, reason: impl Into<String>) -> Self {
        Error::Compile {
            predicate: predicate.to_string(),
            reason: reason.into(),
        }
    }
}
