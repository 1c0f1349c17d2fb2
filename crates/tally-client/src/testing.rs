//! Scripted transport and token builders shared by the unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// One scripted transport outcome, optionally delayed on the virtual
/// clock.
pub(crate) struct Scripted {
    result: Result<TransportResponse, TransportError>,
    delay: Option<Duration>,
}

impl Scripted {
    pub(crate) fn response(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(TransportResponse {
                status,
                retry_after: None,
                body: body.into(),
            }),
            delay: None,
        }
    }

    /// A 200 envelope wrapping `data`.
    pub(crate) fn envelope(data: serde_json::Value) -> Self {
        Self::response(200, json!({"success": true, "data": data}).to_string())
    }

    /// A successful refresh grant, optionally rotating the refresh token.
    pub(crate) fn grant(token: &str, rotated: Option<&str>) -> Self {
        let mut body = json!({"token": token});
        if let Some(refresh) = rotated {
            body["refreshToken"] = json!(refresh);
        }
        Self::response(200, body.to_string())
    }

    pub(crate) fn rate_limited(retry_after: Option<u64>) -> Self {
        Self {
            result: Ok(TransportResponse {
                status: 429,
                retry_after,
                body: String::new(),
            }),
            delay: None,
        }
    }

    pub(crate) fn fail(err: TransportError) -> Self {
        Self {
            result: Err(err),
            delay: None,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// In-memory transport with separate scripts for the refresh endpoint and
/// everything else. Records call counts and the bearer sent with each API
/// call.
#[derive(Default)]
pub(crate) struct MockTransport {
    api_script: Mutex<VecDeque<Scripted>>,
    refresh_script: Mutex<VecDeque<Scripted>>,
    pub(crate) api_calls: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) bearers: Mutex<Vec<Option<String>>>,
    pub(crate) urls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script_api(&self, scripted: Scripted) {
        self.api_script.lock().unwrap().push_back(scripted);
    }

    pub(crate) fn script_refresh(&self, scripted: Scripted) {
        self.refresh_script.lock().unwrap().push_back(scripted);
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst) + self.refresh_calls.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn execute<'a>(
        &'a self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<TransportResponse>> + Send + 'a>> {
        let scripted = if request.url.ends_with("/auth/refresh") {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_script.lock().unwrap().pop_front()
        } else {
            self.api_calls.fetch_add(1, Ordering::SeqCst);
            self.bearers.lock().unwrap().push(request.bearer.clone());
            self.urls.lock().unwrap().push(request.url.clone());
            self.api_script.lock().unwrap().pop_front()
        };
        let scripted =
            scripted.unwrap_or_else(|| panic!("transport script exhausted for {}", request.url));
        Box::pin(async move {
            if let Some(delay) = scripted.delay {
                tokio::time::sleep(delay).await;
            }
            scripted.result
        })
    }
}

/// Build an unsigned JWT whose payload is `claims`.
pub(crate) fn jwt_with(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// A JWT for `user_1` expiring `offset_secs` from now (negative for
/// already expired).
pub(crate) fn jwt_expiring_in(offset_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    jwt_with(json!({
        "sub": "user_1",
        "iat": now,
        "exp": now + offset_secs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_refresh_calls_to_the_refresh_script() {
        let mock = MockTransport::new();
        mock.script_refresh(Scripted::grant("at_new", None));
        mock.script_api(Scripted::envelope(json!({"ok": true})));

        let refresh = mock
            .execute(TransportRequest {
                method: transport::Method::POST,
                url: "https://api.tally.app/auth/refresh".to_string(),
                bearer: None,
                body: None,
                timeout: Duration::from_secs(5),
            })
            .await
            .unwrap();
        assert!(refresh.body.contains("at_new"));

        let api = mock
            .execute(TransportRequest {
                method: transport::Method::GET,
                url: "https://api.tally.app/polls".to_string(),
                bearer: Some("tok".to_string()),
                body: None,
                timeout: Duration::from_secs(5),
            })
            .await
            .unwrap();
        assert_eq!(api.status, 200);

        assert_eq!(mock.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.api_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            mock.bearers.lock().unwrap().as_slice(),
            &[Some("tok".to_string())]
        );
    }

    #[test]
    fn jwt_builder_produces_three_segments() {
        let token = jwt_expiring_in(3600);
        assert_eq!(token.split('.').count(), 3);
    }
}
