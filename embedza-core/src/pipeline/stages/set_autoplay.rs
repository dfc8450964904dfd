//! set-autoplay: mark html players that asked for autoplay.

use async_trait::async_trait;

use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};

pub struct SetAutoplayStage;

impl SetAutoplayStage {
    pub const ID: &'static str = "set-autoplay";
    /// Query fragment renderers append to player URLs.
    pub const MARKER: &'static str = "autoplay=1";
}

#[async_trait]
impl Stage for SetAutoplayStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Set media.autoplay on html players tagged autoplay",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        for snippet in &mut env.result.snippets {
            if snippet.is_type("text/html")
                && snippet.tags.contains("player")
                && snippet.tags.contains("autoplay")
            {
                snippet.media.autoplay = Some(Self::MARKER.to_string());
            }
        }

        Ok(())
    }
}
