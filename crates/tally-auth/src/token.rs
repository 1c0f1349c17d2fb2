//! Access tokens, JWT claims, and the refresh endpoint call
//!
//! Access tokens are opaque bearer strings. When one happens to be a JWT,
//! the payload segment is decoded (no signature verification, the server
//! stays the authority) so the client can learn the expiry and refresh
//! ahead of it. The refresh call POSTs the stored refresh token to
//! `/auth/refresh` and yields a new grant.

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use transport::{Method, Transport, TransportRequest};

use crate::error::{Error, Result};

/// Claims decoded from a JWT access token payload.
///
/// Timestamps are unix seconds as issued by the backend. `sub` and `iat`
/// are informational; `exp` drives proactive refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}

/// A bearer access token, immutable once issued and replaced wholesale on
/// refresh.
///
/// Claims are decoded lazily on first use and cached for the token's
/// lifetime. A token that is not a decodable JWT simply has no claims;
/// callers fall back to reactive 401 handling for those.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    claims: OnceLock<Option<Claims>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            claims: OnceLock::new(),
        }
    }

    /// The raw bearer string for the `Authorization` header.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Decoded claims, when the token is a parsable JWT.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims
            .get_or_init(|| decode_claims(&self.value))
            .as_ref()
    }

    /// Whether the decoded expiry falls within `ahead` of now.
    ///
    /// Tokens with unknowable expiry report false; the 401 path covers them.
    pub fn expires_within(&self, ahead: Duration) -> bool {
        match self.claims() {
            Some(claims) => claims.exp <= unix_now_secs().saturating_add(ahead.as_secs()),
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("claims", &self.claims.get().and_then(|c| c.as_ref()))
            .finish()
    }
}

/// Successful response from the refresh endpoint.
///
/// `refresh_token` is only present when the server rotates it; absence
/// means the old refresh token stays valid.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshGrant {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Exchange a refresh token for a new access grant.
///
/// Called only from the client's refresh coordinator, which guarantees at
/// most one of these is in flight. 401/403 means the refresh token itself
/// was rejected (revoked or expired); any other non-success status is an
/// endpoint failure worth telling apart from a dead session.
pub async fn refresh_session(
    transport: &dyn Transport,
    base_url: &str,
    refresh_token: &str,
    timeout: Duration,
) -> Result<RefreshGrant> {
    let request = TransportRequest {
        method: Method::POST,
        url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        bearer: None,
        body: Some(serde_json::json!({ "refreshToken": refresh_token })),
        timeout,
    };

    let response = transport
        .execute(request)
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    if response.status == 401 || response.status == 403 {
        return Err(Error::RefreshRejected(format!(
            "status {}: {}",
            response.status,
            clip(&response.body, 200)
        )));
    }

    if !(200..300).contains(&response.status) {
        return Err(Error::Endpoint {
            status: response.status,
            message: clip(&response.body, 200).to_owned(),
        });
    }

    serde_json::from_str::<RefreshGrant>(&response.body).map_err(|e| Error::Endpoint {
        status: response.status,
        message: format!("invalid refresh grant: {e}"),
    })
}

/// Decode the payload segment of a JWT without verifying the signature.
fn decode_claims(value: &str) -> Option<Claims> {
    let payload = value.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Seconds since the unix epoch, clamped to zero on a broken clock.
fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Clip a response body for error messages, respecting char boundaries.
fn clip(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
