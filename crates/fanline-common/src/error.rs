//! Error types for fanline
//!
//! This module defines the common error type used throughout the system.
//! Fatal cluster-invariant violations (a key no shard owns, a bad node
//! index) are not represented here: those terminate the process instead of
//! surfacing as a recoverable request error.

use thiserror::Error;

/// Common result type for fanline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for fanline
#[derive(Debug, Error)]
pub enum Error {
    // Validation errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown request")]
    UnknownRequest,

    // Routing errors
    #[error("re-forwarding an already forwarded request")]
    Reforward,

    #[error("unknown response from peer")]
    UnknownResponse,

    #[error("remote shard returned error: {0}")]
    Remote(String),

    // Network errors
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("wire encoding error: {0}")]
    Encoding(String),

    // Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    // Startup errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a remote error wrapping a peer's error reply
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a connection error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this error was caused by the caller's input
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownRequest)
    }

    /// Get the HTTP status code this error maps to
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::UnknownRequest => 400,
            Self::Reforward
            | Self::UnknownResponse
            | Self::Remote(_)
            | Self::ConnectionFailed(_)
            | Self::Encoding(_)
            | Self::Storage(_)
            | Self::Configuration(_)
            | Self::Io(_) => 500,
        }
    }
}
