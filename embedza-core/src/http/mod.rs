//! HTTP request capability used by stages and probers.
//!
//! All outgoing requests go through the `HttpClient` trait so tests can swap
//! in `MockClient` and production code can share one rate-limited client.

mod client;
mod mock;
mod rate_limiter;

pub use client::{
    HttpClient, HttpResponse, Method, ReqwestClient, ReqwestClientBuilder, RequestOptions,
    DEFAULT_MAX_BODY_BYTES,
};
pub use mock::{MockClient, MockResponse};
pub use rate_limiter::RateLimiter;

/// Extract the host from a URL for rate limiting.
pub(crate) fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
