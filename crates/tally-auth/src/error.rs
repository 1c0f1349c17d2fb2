//! Error types for session and token operations

/// Errors from token refresh and secure-store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("refresh endpoint returned {status}: {message}")]
    Endpoint { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("stored token parse error: {0}")]
    Parse(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
