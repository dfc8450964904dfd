use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use embedza_core::{EmbedConfig, EmbedResult, Extractor, Snippet};
use serde::Deserialize;

/// Snippets gathered for one page, as read from the input file.
#[derive(Debug, Deserialize)]
pub struct InputDocument {
    pub src: String,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

pub fn load_input(path: &Path) -> Result<InputDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid snippet document: {}", path.display()))
}

/// Post-process the snippets in `input` and print the result to stdout.
pub async fn process(input: &Path, stages: Option<&[String]>, pretty: bool) -> Result<()> {
    let doc = load_input(input)?;
    let config = EmbedConfig::from_env()?;
    let extractor = Extractor::from_config(config)?;

    let result = run(&extractor, doc, stages).await?;

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}

async fn run(
    extractor: &Extractor,
    doc: InputDocument,
    stages: Option<&[String]>,
) -> Result<EmbedResult> {
    tracing::info!(src = %doc.src, snippets = doc.snippets.len(), "post-processing");

    let result = match stages {
        Some(ids) => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let selected = extractor.stages().select(&ids)?;
            extractor
                .post_process_with(&doc.src, doc.snippets, selected.ordered())
                .await?
        }
        None => extractor.post_process(&doc.src, doc.snippets).await?,
    };

    Ok(result)
}
