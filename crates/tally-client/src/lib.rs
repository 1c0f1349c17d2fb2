//! Tally API client
//!
//! The shared access layer for the app shells. One [`ApiClient`] instance
//! owns the session pair and every request to the backend:
//!
//! 1. `send` attaches the held access token and refreshes it ahead of
//!    expiry, or after a 401, through a single-flight coordinator
//! 2. transient failures (timeouts, connection errors, 5xx) are retried
//!    with capped exponential backoff, but only for requests that are
//!    safe to repeat
//! 3. every failure surfaces as exactly one [`ApiError`] kind, with the
//!    server's machine code and message attached where it reported them
//!
//! The crate never installs a tracing subscriber or metrics recorder;
//! the embedding application owns both.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod retry;

mod classify;
mod metrics;
#[cfg(test)]
mod testing;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use coordinator::RefreshCoordinator;
pub use error::ApiError;
pub use request::ApiRequest;
pub use retry::RetryPolicy;
