//! Stage trait and the environment it operates on.

use async_trait::async_trait;

use crate::error::EmbedError;
use crate::extractor::Extractor;
use crate::types::EmbedResult;

/// Metadata about a stage.
#[derive(Debug, Clone)]
pub struct StageMetadata {
    /// Unique identifier (e.g., "resolve-href", "image-size")
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Lower runs earlier; ties keep registration order.
    pub priority: i32,
}

/// State shared by all stages of one post-processing pass.
pub struct Environment<'a> {
    /// Page the snippets were extracted from.
    pub src: String,
    /// Owning extractor: request capability, cache, config.
    pub extractor: &'a Extractor,
    pub result: EmbedResult,
}

impl<'a> Environment<'a> {
    pub fn new(src: impl Into<String>, extractor: &'a Extractor, result: EmbedResult) -> Self {
        Self {
            src: src.into(),
            extractor,
            result,
        }
    }
}

/// The main trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync {
    fn metadata(&self) -> StageMetadata;

    /// Mutate `env.result` in place.
    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError>;
}

/// Stage backed by a synchronous closure, for ad-hoc post-processing that
/// needs no I/O.
pub struct FnStage<F> {
    metadata: StageMetadata,
    f: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut Environment<'_>) -> Result<(), EmbedError> + Send + Sync,
{
    pub fn new(id: &'static str, f: F) -> Self {
        Self {
            metadata: StageMetadata {
                id,
                description: "Custom stage",
                priority: 0,
            },
            f,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.metadata.priority = priority;
        self
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&mut Environment<'_>) -> Result<(), EmbedError> + Send + Sync,
{
    fn metadata(&self) -> StageMetadata {
        self.metadata.clone()
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        (self.f)(env)
    }
}
