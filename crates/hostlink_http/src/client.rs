//! HTTP client abstraction.
//!
//! [`HttpBackend`](crate::HttpBackend) speaks to the hosted service through
//! the [`HttpClient`] trait, so the network stack can be swapped: reqwest in
//! production, a loopback into an in-process server in tests.

use crate::wire::{HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sends HTTP requests.
///
/// `Err` means no response was received; any status code, success or not,
/// is an `Ok` response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `request` and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// An [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, String> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        debug!(
            method = %request.method,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "http response received"
        );

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| e.to_string())?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Servers that can answer requests in-process.
pub trait LoopbackServer: Send + Sync {
    /// Handles a request.
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

/// An [`HttpClient`] that routes requests directly to a [`LoopbackServer`].
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a client connected to `server`.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

#[async_trait]
impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        Ok(self.server.handle(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl LoopbackServer for Echo {
        fn handle(&self, request: &HttpRequest) -> HttpResponse {
            HttpResponse::new(200, request.url.clone())
        }
    }

    #[tokio::test]
    async fn loopback_routes_to_server() {
        let client = LoopbackClient::new(Echo);
        let response = client
            .send(HttpRequest::new(Method::Get, "http://local/auth/v1/user"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"http://local/auth/v1/user");
    }

    #[test]
    fn reqwest_client_builds() {
        assert!(ReqwestClient::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
