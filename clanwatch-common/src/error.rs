//! Common error types for clanwatch

use thiserror::Error;

/// Common result type for clanwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across clanwatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Clan or player tag that cannot be parsed
    #[error("Invalid tag '{0}': expected letters and digits, optionally prefixed with '#'")]
    InvalidTag(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
