//! HTTP transport seam for the Tally API client
//!
//! Defines the `Transport` trait that decouples dispatch, refresh
//! coordination, and retry logic from any concrete HTTP client. Production
//! code uses the reqwest-backed `HttpTransport`; tests script responses with
//! an in-memory implementation of the same trait.

pub mod http;

pub use http::HttpTransport;
/// Re-exported so callers name methods without a direct reqwest dependency.
pub use reqwest::Method;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// One outbound HTTP call, fully described.
///
/// A transport executes exactly what it is handed; attaching credentials,
/// choosing timeouts, and deciding whether to try again all happen above
/// this seam.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: reqwest::Method,
    pub url: String,
    /// Bearer credential for the `Authorization` header, when the caller
    /// holds one.
    pub bearer: Option<String>,
    /// JSON request body, sent as `application/json` when present.
    pub body: Option<serde_json::Value>,
    /// Per-attempt budget; elapsing is reported as `TransportError::Timeout`.
    pub timeout: Duration,
}

/// Raw response surfaced by a transport. Status interpretation belongs to
/// the caller; the transport only reads the wire.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Numeric `Retry-After` value in seconds, when the server sent one.
    pub retry_after: Option<u64>,
    pub body: String,
}

/// Failure of a single transport attempt, split by retry relevance.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and connection failures may succeed on another attempt.
    /// Anything else (request build errors, response body read failures)
    /// is not worth repeating.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_) | TransportError::Connect(_)
        )
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Abstraction over the HTTP layer.
///
/// One `execute` call is one attempt on the wire. Uses `Pin<Box<dyn Future>>`
/// return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;
}
