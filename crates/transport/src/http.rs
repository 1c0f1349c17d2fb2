//! reqwest-backed transport
//!
//! One `HttpTransport` wraps a shared `reqwest::Client` (connection pooling,
//! rustls). The timeout is applied per request from the descriptor rather
//! than on the client, so every attempt gets the caller's full budget.

use crate::{Transport, TransportError, TransportRequest, TransportResponse};
use std::future::Future;
use std::pin::Pin;

/// Production transport over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn run(&self, request: TransportRequest) -> crate::Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);
        if let Some(bearer) = &request.bearer {
            builder = builder.bearer_auth(bearer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(
        &'a self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = crate::Result<TransportResponse>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}

/// Split reqwest failures into the categories the retry layer cares about.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}
