//! API client
//!
//! One instance owns the session and all request traffic. `send` is the
//! single entry point: it attaches credentials, refreshes the token ahead
//! of expiry or after a 401, retries transient failures for requests that
//! are safe to repeat, and reduces every outcome to a payload or one
//! [`ApiError`].

use std::sync::Arc;

use serde_json::Value;
use tally_auth::SessionStore;
use tracing::{debug, info, warn};
use transport::{Transport, TransportRequest, TransportResponse};
use uuid::Uuid;

use crate::classify;
use crate::config::{ClientConfig, ConfigError};
use crate::coordinator::RefreshCoordinator;
use crate::error::ApiError;
use crate::metrics;
use crate::request::{ApiRequest, Envelope};
use crate::retry::RetryPolicy;

pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    sessions: Arc<SessionStore>,
    refresher: RefreshCoordinator,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Wire a client from its parts. The config is validated here so a
    /// misconfigured client never dispatches anything.
    pub fn new(
        config: ClientConfig,
        sessions: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let retry = RetryPolicy::new(config.max_attempts, config.retry_base(), config.retry_max());
        let refresher = RefreshCoordinator::new(
            Arc::clone(&sessions),
            Arc::clone(&transport),
            config.base_url.clone(),
            config.request_timeout(),
        );
        Ok(Self {
            config,
            transport,
            sessions,
            refresher,
            retry,
        })
    }

    /// Whether a session pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated().await
    }

    /// Adopt a session obtained out of band (login, account creation).
    pub async fn set_session(&self, access: &str, refresh: &str) -> Result<(), ApiError> {
        self.sessions
            .install(access, refresh)
            .await
            .map_err(store_failure)
    }

    /// Drop the held session from memory and the secure store.
    pub async fn logout(&self) -> Result<(), ApiError> {
        info!("logout requested");
        self.sessions.clear().await.map_err(store_failure)
    }

    /// Dispatch one request and return its decoded payload.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let result = self.send_inner(request).await;
        if let Err(err) = &result {
            metrics::record_error(err.kind_label());
        }
        result
    }

    async fn send_inner(&self, mut request: ApiRequest) -> Result<Value, ApiError> {
        let request_id = format!("req_{}", Uuid::new_v4().as_simple());
        debug!(
            request_id,
            method = %request.method(),
            path = request.path(),
            "dispatching api request"
        );

        let mut bearer = None;
        if request.auth_required() {
            if let Some(token) = self.sessions.access_token().await {
                if token.expires_within(self.config.refresh_ahead()) {
                    debug!(request_id, "held token inside expiry window, refreshing first");
                    let fresh = self.refresher.acquire().await?;
                    bearer = Some(fresh.value().to_owned());
                } else {
                    bearer = Some(token.value().to_owned());
                }
            }
        }

        loop {
            let response = self
                .dispatch_with_retry(&request, bearer.as_deref(), &request_id)
                .await?;

            match response.status {
                status if (200..300).contains(&status) => {
                    return parse_envelope(&response);
                }
                401 if request.auth_required() && !request.replayed() => {
                    debug!(request_id, "got 401, refreshing and replaying once");
                    request.mark_replayed();
                    match self.refresher.acquire().await {
                        Ok(fresh) => {
                            bearer = Some(fresh.value().to_owned());
                        }
                        Err(err) => {
                            warn!(request_id, error = %err, "refresh after 401 failed");
                            return Err(ApiError::Unauthenticated {
                                code: err.code().map(str::to_owned),
                                message: format!("credentials rejected and refresh failed: {err}"),
                            });
                        }
                    }
                }
                _ => return Err(classify::response_failure(&response)),
            }
        }
    }

    /// Run one request through the transport, retrying transient failures
    /// per the policy. Returns the first non-5xx response.
    async fn dispatch_with_retry(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        request_id: &str,
    ) -> Result<TransportResponse, ApiError> {
        let url = join_url(&self.config.base_url, request.path());
        let mut attempt: u32 = 0;

        loop {
            let call = TransportRequest {
                method: request.method().clone(),
                url: url.clone(),
                bearer: bearer.map(str::to_owned),
                body: request.body().cloned(),
                timeout: self.config.request_timeout(),
            };

            let outcome = self.transport.execute(call).await;
            if let Ok(response) = &outcome {
                metrics::record_request(request.method().as_str(), response.status);
            }

            let (failure, transient) = match outcome {
                Ok(response) if response.status >= 500 => {
                    (classify::response_failure(&response), true)
                }
                Ok(response) => return Ok(response),
                Err(err) => {
                    let transient = err.is_transient();
                    (classify::transport_failure(&err), transient)
                }
            };

            if transient && self.retry.should_retry(attempt, &failure, request.retry_safe()) {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    request_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "transient failure, retrying"
                );
                metrics::record_retry(failure.kind_label());
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(failure);
        }
    }
}

fn store_failure(err: tally_auth::Error) -> ApiError {
    ApiError::Unrecoverable {
        code: Some("store".to_string()),
        message: err.to_string(),
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Interpret a 2xx body under the response envelope contract. An empty
/// body stands for a null payload.
fn parse_envelope(response: &TransportResponse) -> Result<Value, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let envelope: Envelope =
        serde_json::from_str(&response.body).map_err(|err| ApiError::Server {
            status: response.status,
            message: format!("undecodable response body: {err}"),
        })?;
    if envelope.success {
        Ok(envelope.data.unwrap_or(Value::Null))
    } else {
        let error = envelope.error.unwrap_or_default();
        Err(ApiError::Validation {
            code: error.code,
            message: error
                .message
                .unwrap_or_else(|| "request rejected by server".to_string()),
        })
    }
}
