//! Request error taxonomy
//!
//! Every failure leaving [`crate::ApiClient::send`] is exactly one of
//! these kinds, so callers branch on what happened rather than on raw
//! status codes or transport details.

/// Classified outcome of a failed API request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response (timeout, connection
    /// failure, interrupted transfer).
    #[error("network failure: {message}")]
    Network { message: String },

    /// The server answered with a 5xx status or broke the response
    /// contract.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// The server shed load with a 429. `retry_after` carries the
    /// server's hint in seconds when one was sent.
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },

    /// Credentials were rejected and could not be repaired by a refresh.
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        code: Option<String>,
        message: String,
    },

    /// The server rejected the request itself (4xx with a reported
    /// reason).
    #[error("request rejected: {message}")]
    Validation {
        code: Option<String>,
        message: String,
    },

    /// The session cannot be repaired without the user signing in again.
    /// The held session has already been cleared when this surfaces.
    #[error("session unrecoverable: {message}")]
    Unrecoverable {
        code: Option<String>,
        message: String,
    },
}

impl ApiError {
    /// Machine-readable code reported by the server, where one exists.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Unauthenticated { code, .. }
            | ApiError::Validation { code, .. }
            | ApiError::Unrecoverable { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Server-provided wait hint in seconds, for rate-limit failures.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub(crate) fn kind_label(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => "network",
            ApiError::Server { .. } => "server",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::Validation { .. } => "validation",
            ApiError::Unrecoverable { .. } => "unrecoverable",
        }
    }
}
