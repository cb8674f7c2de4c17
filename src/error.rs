//! Custom error types for the decoding-graph core.
//!
//! This module provides a centralized error handling system using the `thiserror` crate
//! to define structured, typed errors with clear messages and proper error conversion.
//!
//! Only recoverable outcomes travel through [`SioError`]. Precondition violations
//! (touching an empty graph, dereferencing a freed handle, using a language model
//! before it was loaded) are programming errors and panic instead.

use std::io;
use thiserror::Error;

/// Primary error type for the crate, covering all recoverable failure cases.
#[derive(Debug, Error)]
pub enum SioError {
    /// Errors from the underlying IO system.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A graph file or graph text could not be parsed.
    #[error("Malformed graph: {0}")]
    Format(String),

    /// A vocabulary listing could not be parsed or lacks required special tokens.
    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    /// A token string that is not part of the vocabulary.
    #[error("Token not found in vocabulary: {0:?}")]
    TokenNotFound(String),

    /// A token id outside the vocabulary range.
    #[error("Token id {0} out of range")]
    TokenIdOutOfRange(i32),

    /// An operation that needs a loaded graph was given an empty one.
    #[error("Graph is empty")]
    EmptyGraph,

    /// A load was attempted on an instance that already holds data.
    #[error("Reloading is not supported: {0}")]
    AlreadyLoaded(&'static str),

    /// Invalid allocator sizing.
    #[error("Allocator error: {0}")]
    Allocator(String),

    /// Errors from invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results with SioError.
pub type Result<T> = std::result::Result<T, SioError>;

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to the error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to the error.
    fn with_static_context(self, context: &'static str) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, io::Error> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SioError::Io(io::Error::new(e.kind(), format!("{}: {}", f(), e))))
    }

    fn with_static_context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| SioError::Io(io::Error::new(e.kind(), format!("{}: {}", context, e))))
    }
}
