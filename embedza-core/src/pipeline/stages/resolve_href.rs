//! resolve-href: make every snippet href absolute.
//!
//! - `/img/icon.png` -> `http://example.com/img/icon.png`
//! - `//example.com/img/icon.png` -> `http(s)://example.com/img/icon.png`

use async_trait::async_trait;
use url::Url;

use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};

pub struct ResolveHrefStage;

impl ResolveHrefStage {
    pub const ID: &'static str = "resolve-href";
}

#[async_trait]
impl Stage for ResolveHrefStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Resolve relative and protocol-relative hrefs against the source URL",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        let base = Url::parse(&env.src).ok();

        for snippet in &mut env.result.snippets {
            if snippet.href.is_empty() {
                continue;
            }

            match Url::parse(&snippet.href) {
                Ok(_) => {}
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    // `join` covers both relative paths and `//host` refs,
                    // the latter taking the base's scheme.
                    match base.as_ref().map(|b| b.join(&snippet.href)) {
                        Some(Ok(resolved)) => snippet.href = resolved.into(),
                        _ => tracing::debug!(href = %snippet.href, src = %env.src, "cannot resolve href"),
                    }
                }
                Err(e) => tracing::debug!(href = %snippet.href, error = %e, "unparseable href"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::NoCache;
    use crate::extractor::Extractor;
    use crate::http::MockClient;
    use crate::types::{EmbedResult, Snippet};

    fn hrefs(env: &Environment<'_>) -> Vec<String> {
        env.result.snippets.iter().map(|s| s.href.clone()).collect()
    }

    #[tokio::test]
    async fn test_resolve_href() {
        let extractor = Extractor::new(Arc::new(MockClient::new()), Arc::new(NoCache));
        let mut env = Environment::new(
            "http://example.com/test/",
            &extractor,
            EmbedResult {
                snippets: vec![
                    Snippet::new("/img/foo.png"),
                    Snippet::new("img/bar.png"),
                    Snippet::new("//example.com/baz.png"),
                    Snippet::new("http://example.com/test.png"),
                    Snippet::new(""),
                ],
            },
        );

        ResolveHrefStage.run(&mut env).await.unwrap();

        assert_eq!(
            hrefs(&env),
            vec![
                "http://example.com/img/foo.png",
                "http://example.com/test/img/bar.png",
                "http://example.com/baz.png",
                "http://example.com/test.png",
                "",
            ]
        );

        // Running again changes nothing.
        ResolveHrefStage.run(&mut env).await.unwrap();
        assert_eq!(hrefs(&env)[1], "http://example.com/test/img/bar.png");
    }

    #[tokio::test]
    async fn test_protocol_relative_takes_https() {
        let extractor = Extractor::new(Arc::new(MockClient::new()), Arc::new(NoCache));
        let mut env = Environment::new(
            "https://example.org/page",
            &extractor,
            EmbedResult {
                snippets: vec![Snippet::new("//cdn.example.com/x.jpg")],
            },
        );

        ResolveHrefStage.run(&mut env).await.unwrap();

        assert_eq!(hrefs(&env), vec!["https://cdn.example.com/x.jpg"]);
    }

    #[tokio::test]
    async fn test_unresolvable_without_base() {
        let extractor = Extractor::new(Arc::new(MockClient::new()), Arc::new(NoCache));
        let mut env = Environment::new(
            "badurl",
            &extractor,
            EmbedResult {
                snippets: vec![Snippet::new("img/a.png")],
            },
        );

        ResolveHrefStage.run(&mut env).await.unwrap();

        assert_eq!(hrefs(&env), vec!["img/a.png"]);
    }
}
