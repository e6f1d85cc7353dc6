//! Client error types

use thiserror::Error;

/// Client operation errors
///
/// Delivery failures are not reported here. Once a request is accepted it is
/// retried, failed over, or eventually abandoned in the background; these
/// errors only cover startup and handle-level problems.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error during socket setup
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Client task is no longer running
    #[error("Client is shutting down")]
    ShuttingDown,
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
