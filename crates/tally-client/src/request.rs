//! Request description and response envelope

use serde::Deserialize;
use transport::Method;

/// One API call to be dispatched by [`crate::ApiClient::send`].
///
/// Paths are joined to the configured base URL. Requests default to
/// authenticated; use [`ApiRequest::public`] for endpoints that take no
/// credentials, such as login itself.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    auth_required: bool,
    idempotent: bool,
    replayed: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth_required: true,
            idempotent: false,
            replayed: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::PUT, path);
        request.body = Some(body);
        request
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Send without credentials and never attempt a refresh on 401.
    pub fn public(mut self) -> Self {
        self.auth_required = false;
        self
    }

    /// Mark a request safe to repeat even though its method is not
    /// idempotent by convention. Callers own this claim.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub(crate) fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Whether the retry policy may repeat this request at all.
    pub(crate) fn retry_safe(&self) -> bool {
        self.idempotent
            || self.method == Method::GET
            || self.method == Method::PUT
            || self.method == Method::DELETE
    }

    pub(crate) fn replayed(&self) -> bool {
        self.replayed
    }

    pub(crate) fn mark_replayed(&mut self) {
        self.replayed = true;
    }
}

/// Standard response body shape: `{success, data?, error?}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<EnvelopeError>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EnvelopeError {
    pub code: Option<String>,
    pub message: Option<String>,
}
