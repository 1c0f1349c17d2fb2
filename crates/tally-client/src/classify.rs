//! Failure classification
//!
//! Pure functions mapping transport outcomes onto the [`ApiError`]
//! taxonomy. Server-reported error envelopes contribute their machine
//! code and message; anything else falls back to a body snippet.

use transport::{TransportError, TransportResponse};

use crate::error::ApiError;
use crate::request::Envelope;

const SNIPPET_LEN: usize = 120;

/// Classify a failure below the HTTP layer.
pub(crate) fn transport_failure(err: &TransportError) -> ApiError {
    ApiError::Network {
        message: err.to_string(),
    }
}

/// Classify a response whose status indicates failure.
pub(crate) fn response_failure(response: &TransportResponse) -> ApiError {
    let (code, message) = envelope_failure(&response.body, response.status);
    match response.status {
        401 => ApiError::Unauthenticated { code, message },
        429 => ApiError::RateLimited {
            retry_after: response.retry_after,
            message,
        },
        status if status >= 500 => ApiError::Server { status, message },
        status if status >= 400 => ApiError::Validation { code, message },
        // Anything else here (redirects, informational) breaks the
        // contract; treat it as a server fault.
        status => ApiError::Server { status, message },
    }
}

/// Pull the reported code and message out of an error envelope body.
fn envelope_failure(body: &str, status: u16) -> (Option<String>, String) {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        if let Some(error) = envelope.error {
            let message = error
                .message
                .unwrap_or_else(|| format!("status {status}"));
            return (error.code, message);
        }
    }
    (None, snippet_or_status(body, status))
}

fn snippet_or_status(body: &str, status: u16) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("status {status}");
    }
    let mut end = SNIPPET_LEN.min(trimmed.len());
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
