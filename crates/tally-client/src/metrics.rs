//! Metrics emission
//!
//! Thin wrappers over the `metrics` facade. The embedding application
//! decides whether to install a recorder; without one every call is a
//! no-op.

/// Count a dispatch that produced a response.
pub(crate) fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count one scheduled retry, labelled by the failure that caused it.
pub(crate) fn record_retry(kind: &'static str) {
    metrics::counter!("api_client_retries_total", "kind" => kind).increment(1);
}

/// Count a settled refresh operation.
pub(crate) fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_client_token_refreshes_total", "outcome" => outcome).increment(1);
}

/// Count a send that surfaced a classified error to the caller.
pub(crate) fn record_error(kind: &'static str) {
    metrics::counter!("api_client_errors_total", "kind" => kind).increment(1);
}
