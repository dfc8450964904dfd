//! Mock HTTP client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::TransportError;

use super::client::{append_capped, HttpClient, HttpResponse, Method, RequestOptions};

/// Canned reply for one (method, url) pair.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Reply(HttpResponse),
    Error(TransportError),
}

/// Mock HTTP client that records every request it receives.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: HashMap<(Method, String), MockResponse>,
    calls: Mutex<Vec<(Method, String)>>,
    max_body_bytes: Option<usize>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap GET bodies the way `ReqwestClient` does.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = Some(max);
        self
    }

    pub fn with_response(mut self, method: Method, url: &str, response: MockResponse) -> Self {
        self.responses.insert((method, url.to_string()), response);
        self
    }

    /// GET `url` answers 200 with `body`.
    pub fn with_bytes(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(
            Method::Get,
            url,
            MockResponse::Reply(HttpResponse::new(200).with_body(body)),
        )
    }

    /// HEAD `url` answers `status` with the given content type.
    pub fn with_head(self, url: &str, status: u16, content_type: Option<&str>) -> Self {
        let mut response = HttpResponse::new(status);
        if let Some(content_type) = content_type {
            response = response.with_header("content-type", content_type);
        }
        self.with_response(Method::Head, url, MockResponse::Reply(response))
    }

    pub fn with_status(self, method: Method, url: &str, status: u16) -> Self {
        self.with_response(method, url, MockResponse::Reply(HttpResponse::new(status)))
    }

    pub fn with_error(self, method: Method, url: &str, error: TransportError) -> Self {
        self.with_response(method, url, MockResponse::Error(error))
    }

    /// All requests received so far, in order.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of requests received for `url`, any method.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(_, u)| u == url).count()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((options.method, url.to_string()));
        }

        match self.responses.get(&(options.method, url.to_string())) {
            Some(MockResponse::Reply(response)) => {
                let mut response = response.clone();
                if let (Method::Get, Some(max)) = (options.method, self.max_body_bytes) {
                    let mut body = Vec::new();
                    append_capped(&mut body, &response.body, max);
                    response.body = body;
                }
                Ok(response)
            }
            Some(MockResponse::Error(e)) => Err(e.clone()),
            None => Err(TransportError::new(format!(
                "connect ECONNREFUSED: no mock response for {} {}",
                options.method.as_str(),
                url
            ))),
        }
    }
}
