//! merge: collapse snippets sharing an href.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};
use crate::types::Snippet;

/// The first snippet seen for an href is the base. Later duplicates add
/// their tags and deep-merge their media over it, later values winning.
pub struct MergeStage;

impl MergeStage {
    pub const ID: &'static str = "merge";
}

#[async_trait]
impl Stage for MergeStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Merge snippets with the same href",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        let snippets = std::mem::take(&mut env.result.snippets);
        let mut merged: Vec<Snippet> = Vec::with_capacity(snippets.len());
        let mut by_href: HashMap<String, usize> = HashMap::new();

        for snippet in snippets {
            match by_href.get(&snippet.href) {
                Some(&idx) => {
                    let base = &mut merged[idx];
                    base.tags.union(&snippet.tags);
                    base.media.merge_from(&snippet.media);
                }
                None => {
                    by_href.insert(snippet.href.clone(), merged.len());
                    merged.push(snippet);
                }
            }
        }

        env.result.snippets = merged;
        Ok(())
    }
}
