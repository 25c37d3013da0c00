//! Transport abstraction and the reqwest-backed HTTP implementation.
//!
//! The engine only ever calls [`Transport::send`]. Connection pooling, TLS,
//! and timeouts are the transport's business.

use std::time::Duration;

use async_trait::async_trait;

use crate::loadtest::error::{LoadTestError, TransportError};
use crate::loadtest::request::{HttpResponse, RequestTemplate};

/// Sends one request and returns the fully buffered response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestTemplate) -> Result<HttpResponse, TransportError>;
}

/// HTTP transport over a shared [`reqwest::Client`].
///
/// The client is cheap to clone and pools connections internally, so one
/// instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, LoadTestError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tapa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadTestError::TransportSetup {
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, timeout))
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RequestTemplate) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .timeout(self.timeout);
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::classify_reqwest(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::classify_reqwest(&e))?;

        Ok(HttpResponse::from_parts(status, headers, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_keeps_timeout() {
        let transport = HttpTransport::new(Duration::from_millis(250)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let request = RequestTemplate::get("http://127.0.0.1:1/").unwrap();
        let err = transport.send(request).await.unwrap_err();
        assert!(
            matches!(err, TransportError::Connection { .. } | TransportError::Timeout),
            "unexpected error: {err:?}"
        );
    }
}
