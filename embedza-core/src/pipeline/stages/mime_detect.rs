//! mime-detect: fill in a missing snippet type.
//!
//! Known video extensions are mapped directly; anything else costs a HEAD
//! request. Snippets whose type cannot be determined are dropped.

use async_trait::async_trait;

use super::path_extension;
use crate::error::EmbedError;
use crate::http::RequestOptions;
use crate::pipeline::{Environment, Stage, StageMetadata};

const EXTENSION_TYPES: &[(&str, &str)] = &[
    (".mp4", "video/mp4"),
    (".ogg", "video/ogg"),
    (".webm", "video/webm"),
];

pub struct MimeDetectStage;

impl MimeDetectStage {
    pub const ID: &'static str = "mime-detect";
}

fn bad_status(status: u16) -> EmbedError {
    EmbedError::HttpStatus {
        status,
        message: format!("Mime-detect stage: Bad response code: {}", status),
    }
}

fn type_from_extension(href: &str) -> Option<&'static str> {
    let ext = path_extension(href)?;
    EXTENSION_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, t)| *t)
}

#[async_trait]
impl Stage for MimeDetectStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Detect snippet content type by extension or HEAD request",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        let extractor = env.extractor;
        let mut keep = vec![true; env.result.snippets.len()];

        for (idx, snippet) in env.result.snippets.iter_mut().enumerate() {
            if snippet.mime_type.is_some() {
                continue;
            }

            if let Some(mime_type) = type_from_extension(&snippet.href) {
                snippet.mime_type = Some(mime_type.to_string());
                continue;
            }

            tracing::debug!(href = %snippet.href, "mime-detect: request");

            let response = extractor
                .request(&snippet.href, RequestOptions::head())
                .await
                .map_err(|e| match e.status {
                    Some(status) => bad_status(status),
                    None => EmbedError::Transport(e),
                })?;

            if !response.is_success() {
                return Err(bad_status(response.status));
            }

            let mime_type = response
                .header("content-type")
                .and_then(|ct| ct.split(';').next())
                .map(str::trim)
                .filter(|t| !t.is_empty());

            match mime_type {
                Some(mime_type) => {
                    if mime_type == "text/html" {
                        snippet.tags.insert("html5");
                    }
                    snippet.mime_type = Some(mime_type.to_string());
                }
                None => {
                    tracing::debug!(href = %snippet.href, "mime-detect: no content type, dropping");
                    keep[idx] = false;
                }
            }
        }

        let mut flags = keep.into_iter();
        env.result
            .snippets
            .retain(|_| flags.next().unwrap_or(true));

        Ok(())
    }
}
