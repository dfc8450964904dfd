//! ssl-force: tag snippets served over https.

use async_trait::async_trait;
use url::Url;

use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};

pub struct SslForceStage;

impl SslForceStage {
    pub const ID: &'static str = "ssl-force";
    pub const TAG: &'static str = "ssl";
}

#[async_trait]
impl Stage for SslForceStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Add the ssl tag to https snippets",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        for snippet in &mut env.result.snippets {
            let secure = !snippet.href.is_empty()
                && Url::parse(&snippet.href).is_ok_and(|u| u.scheme() == "https");

            if secure {
                snippet.tags.insert(Self::TAG);
            }
        }

        Ok(())
    }
}
