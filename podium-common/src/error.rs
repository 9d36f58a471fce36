//! Common error types for Podium services

use thiserror::Error;

/// Common result type for Podium operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across Podium services
///
/// Errors from a single client connection must never affect other
/// connections; only `Internal` is allowed to be fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced session id is not registered in the session store
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Session id is already active (duplicate start)
    #[error("Session already active: {0}")]
    AlreadyExists(String),

    /// Malformed inbound message or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A feature analyzer or baseline collaborator failed
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// The underlying duplex connection broke
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error should tear down the owning stream connection
    ///
    /// Validation and analyzer failures are per-message; the connection
    /// stays open. An unknown session is fatal to the stream.
    pub fn is_fatal_to_stream(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Transport(_) | Error::Internal(_))
    }
}
