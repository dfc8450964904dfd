//! Image dimension probing.
//!
//! A prober fetches a resource and sniffs its size from the leading bytes.
//! Unparseable content is reported separately from transport and status
//! failures so the image-size stage can treat it as a soft miss.

mod sniff;

pub use sniff::sniff_dimensions;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{EmbedError, TransportError};
use crate::http::{HttpClient, RequestOptions};
use crate::types::ImageDimensions;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The resource exists but is not a recognizable image.
    #[error("Unrecognized image content: {0}")]
    Content(String),

    #[error("Bad response code: {0}")]
    Status(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<ProbeError> for EmbedError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Content(msg) => EmbedError::Content(msg),
            ProbeError::Status(status) => EmbedError::HttpStatus {
                status,
                message: format!("Image-size stage: Bad response code: {}", status),
            },
            ProbeError::Transport(e) => EmbedError::Transport(e),
        }
    }
}

#[async_trait]
pub trait ImageProber: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ImageDimensions, ProbeError>;
}

/// Prober that downloads the resource through an `HttpClient`.
pub struct HttpProber<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> HttpProber<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> ImageProber for HttpProber<C> {
    async fn probe(&self, url: &str) -> Result<ImageDimensions, ProbeError> {
        let response = self.client.request(url, RequestOptions::get()).await?;

        if !response.is_success() {
            return Err(ProbeError::Status(response.status));
        }

        sniff_dimensions(&response.body)
    }
}

/// 1x1 transparent GIF.
#[cfg(test)]
pub(crate) const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04,
    0x01, 0x0a, 0x00, 0x01, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x02, 0x4c, 0x01, 0x00, 0x3b,
];
