//! HTTP client trait and the reqwest-backed implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

use super::host_of;
use super::rate_limiter::RateLimiter;

/// Default cap on response bodies read into memory (10MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self { method: Method::Get }
    }

    pub fn head() -> Self {
        Self {
            method: Method::Head,
        }
    }
}

/// A completed HTTP exchange. Non-2xx statuses are returned as responses,
/// not errors; callers decide what a bad status means for them.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Append `chunk` to `body` without growing it past `max` bytes. Returns
/// true once the cap is reached and reading should stop.
///
/// Bytes past the cap are dropped: callers only sniff leading bytes, and
/// every supported image format keeps its size in the header.
pub(crate) fn append_capped(body: &mut Vec<u8>, chunk: &[u8], max: usize) -> bool {
    let room = max.saturating_sub(body.len());
    if chunk.len() < room {
        body.extend_from_slice(chunk);
        return false;
    }
    body.extend_from_slice(&chunk[..room]);
    true
}

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError> {
        (**self).request(url, options).await
    }
}

/// Configuration for ReqwestClient.
#[derive(Debug, Clone)]
pub struct ReqwestClientBuilder {
    timeout: Duration,
    user_agent: String,
    rate_limit_ms: u64,
    max_body_bytes: usize,
}

impl Default for ReqwestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestClientBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("embedza/", env!("CARGO_PKG_VERSION")).to_string(),
            rate_limit_ms: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set the delay between requests to the same host. 0 disables it.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Stop reading response bodies after this many bytes.
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn build(self) -> Result<ReqwestClient, TransportError> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;

        Ok(ReqwestClient {
            inner,
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
            max_body_bytes: self.max_body_bytes,
        })
    }
}

/// Production HTTP client.
pub struct ReqwestClient {
    inner: reqwest::Client,
    rate_limiter: RateLimiter,
    max_body_bytes: usize,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, TransportError> {
        ReqwestClientBuilder::new().build()
    }

    pub fn builder() -> ReqwestClientBuilder {
        ReqwestClientBuilder::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| TransportError::new(format!("Invalid URI \"{}\": {}", url, e)))?;

        if let Some(host) = host_of(url) {
            self.rate_limiter.wait(&host).await;
        }

        let request = match options.method {
            Method::Get => self.inner.get(parsed),
            Method::Head => self.inner.head(parsed),
        };

        tracing::debug!(url, method = options.method.as_str(), "network: request");
        let mut response = request.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        if options.method == Method::Get {
            while let Some(chunk) = response.chunk().await? {
                if append_capped(&mut body, &chunk, self.max_body_bytes) {
                    tracing::debug!(url, limit = self.max_body_bytes, "body cap reached");
                    break;
                }
            }
        }

        tracing::debug!(url, status, bytes = body.len(), "network: response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
