//! image-size: look up pixel dimensions for image snippets.
//!
//! Each distinct href is probed at most once per pass. Lookups run
//! concurrently and go through the extractor cache under `image#<href>`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::path_extension;
use crate::cache::Cache;
use crate::error::EmbedError;
use crate::pipeline::{Environment, Stage, StageMetadata};
use crate::probe::{ImageProber, ProbeError};
use crate::types::{ImageDimensions, MediaValue};

/// How long a cached lookup stays valid.
pub const IMAGE_SIZE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".bmp", ".gif", ".jpg", ".jpeg", ".png", ".psd", ".tif", ".tiff", ".webp", ".svg",
];

/// Cached value for one image URL.
#[derive(Debug, Serialize, Deserialize)]
struct CachedSize {
    dimensions: ImageDimensions,
    /// Unix milliseconds.
    ts: i64,
}

pub struct ImageSizeStage;

impl ImageSizeStage {
    pub const ID: &'static str = "image-size";
}

fn cache_key(href: &str) -> String {
    format!("image#{}", href)
}

/// Resolve dimensions for one URL. `Ok(None)` means the content could not
/// be recognized as an image.
async fn load_image_size(
    href: &str,
    cache: &dyn Cache,
    prober: &dyn ImageProber,
) -> Result<Option<ImageDimensions>, EmbedError> {
    let key = cache_key(href);
    let now = Utc::now().timestamp_millis();
    let ttl_ms = IMAGE_SIZE_TTL.as_millis() as i64;

    if let Some(value) = cache.get(&key).await? {
        match serde_json::from_value::<CachedSize>(value) {
            Ok(cached) if cached.ts > now - ttl_ms => {
                tracing::debug!(href, "image-size: cache hit");
                return Ok(Some(cached.dimensions));
            }
            Ok(_) => tracing::debug!(href, "image-size: cache entry expired"),
            Err(e) => tracing::warn!(href, error = %e, "image-size: ignoring malformed cache entry"),
        }
    }

    let dimensions = match prober.probe(href).await {
        Ok(d) => d,
        Err(ProbeError::Content(msg)) => {
            tracing::debug!(href, reason = %msg, "image-size: unrecognized content");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let entry = CachedSize {
        dimensions: dimensions.clone(),
        ts: Utc::now().timestamp_millis(),
    };
    let value = serde_json::to_value(&entry).map_err(|e| EmbedError::Stage {
        stage: ImageSizeStage::ID.to_string(),
        message: e.to_string(),
    })?;
    cache.set(&key, value).await?;

    Ok(Some(dimensions))
}

#[async_trait]
impl Stage for ImageSizeStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            id: Self::ID,
            description: "Load pixel dimensions of image snippets",
            priority: 0,
        }
    }

    async fn run(&self, env: &mut Environment<'_>) -> Result<(), EmbedError> {
        let queue: Vec<usize> = env
            .result
            .snippets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_type("image") && !s.media.has_size())
            .filter(|(_, s)| {
                path_extension(&s.href).is_some_and(|ext| {
                    SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                })
            })
            .map(|(idx, _)| idx)
            .collect();

        let mut seen = HashSet::new();
        let unique_hrefs: Vec<String> = queue
            .iter()
            .map(|&idx| env.result.snippets[idx].href.clone())
            .filter(|href| seen.insert(href.clone()))
            .collect();

        if unique_hrefs.is_empty() {
            return Ok(());
        }

        let extractor = env.extractor;
        let limit = extractor
            .config()
            .image_size_concurrency
            .unwrap_or(unique_hrefs.len())
            .clamp(1, unique_hrefs.len());
        let permits = Arc::new(Semaphore::new(limit));

        let mut tasks = JoinSet::new();
        for href in unique_hrefs {
            let cache = Arc::clone(extractor.cache());
            let prober = Arc::clone(extractor.prober());
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                tracing::debug!(href = %href, "image-size: load");
                let result = load_image_size(&href, cache.as_ref(), prober.as_ref()).await;
                (href, result)
            });
        }

        // Wait for every lookup, even after a failure.
        let mut dimensions: HashMap<String, Option<ImageDimensions>> = HashMap::new();
        let mut first_error: Option<EmbedError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((href, Ok(size))) => {
                    dimensions.insert(href, size);
                }
                Ok((href, Err(e))) => {
                    tracing::debug!(href = %href, error = %e, "image-size: lookup failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(EmbedError::Stage {
                        stage: Self::ID.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        for idx in queue {
            let snippet = &mut env.result.snippets[idx];

            let Some(Some(size)) = dimensions.get(&snippet.href) else {
                continue;
            };

            // SVGs sized in inches, percents etc. can't be placed as pixels.
            if !size.is_pixels() {
                continue;
            }

            snippet.media.width = Some(MediaValue::Number(size.width));
            snippet.media.height = Some(MediaValue::Number(size.height));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::{json, Value as JsonValue};

    use crate::cache::MemoryCache;
    use crate::config::EmbedConfig;
    use crate::error::StoreError;
    use crate::extractor::Extractor;
    use crate::http::{Method, MockClient};
    use crate::probe::PIXEL_GIF;
    use crate::types::{EmbedResult, Media, Snippet};

    /// Cache whose reads and/or writes fail.
    struct BrokenCache {
        fail_get: bool,
        fail_set: bool,
        gets: AtomicUsize,
    }

    impl BrokenCache {
        fn new(fail_get: bool, fail_set: bool) -> Self {
            Self {
                fail_get,
                fail_set,
                gets: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<JsonValue>, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_get {
                return Err(StoreError("err".to_string()));
            }
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: JsonValue) -> Result<(), StoreError> {
            if self.fail_set {
                return Err(StoreError("err".to_string()));
            }
            Ok(())
        }
    }

    /// Cache that always returns one fixed value.
    struct FixedCache(JsonValue, Mutex<Vec<String>>);

    #[async_trait]
    impl Cache for FixedCache {
        async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
            self.1.lock().unwrap().push(key.to_string());
            Ok(Some(self.0.clone()))
        }

        async fn set(&self, _key: &str, _value: JsonValue) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn image(href: &str) -> Snippet {
        Snippet::new(href).with_type("image")
    }

    #[tokio::test]
    async fn test_image_size() {
        let client = Arc::new(
            MockClient::new()
                .with_bytes("http://example.com/1.jpg", PIXEL_GIF)
                .with_bytes("http://example.com/2.png", PIXEL_GIF)
                .with_bytes(
                    "http://example.com/3.svg",
                    r#"<svg width="5in" height="4px"></svg>"#,
                )
                .with_bytes(
                    "http://example.com/4.svg",
                    r#"<svg width="1px" viewbox="0 0 100 50">"#,
                )
                .with_bytes("http://example.com/5.jpg", vec![0xd3, 0x4d, 0x34]),
        );
        let cache = Arc::new(MemoryCache::new());
        let extractor = Extractor::new(client.clone(), cache.clone());

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![
                    image("http://example.com/1.jpg"),
                    image("http://example.com/2.png"),
                    image("http://example.com/2.zzz"),
                    Snippet::new("http://example.com/3.zzz").with_type("test"),
                    image("http://example.com/4.zzz").with_media(Media::sized(10.0, 20.0)),
                    image("http://example.com/3.svg"),
                    image("http://example.com/4.svg"),
                    image("http://example.com/5.jpg"),
                ],
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();

        let snippets = &env.result.snippets;
        assert_eq!(snippets[0].media, Media::sized(1.0, 1.0));
        assert_eq!(snippets[1].media, Media::sized(1.0, 1.0));
        assert!(snippets[2].media.is_empty());
        assert!(snippets[3].media.is_empty());
        assert_eq!(snippets[4].media, Media::sized(10.0, 20.0));
        assert!(snippets[5].media.is_empty());
        assert_eq!(snippets[6].media, Media::sized(1.0, 0.5));
        assert!(snippets[7].media.is_empty());

        // Unrecognized content is not cached; everything else is.
        assert_eq!(cache.len(), 4);
        assert_eq!(client.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_shared_href_is_looked_up_once() {
        let client = Arc::new(MockClient::new().with_bytes("http://example.com/1.png", PIXEL_GIF));
        let cache = Arc::new(BrokenCache::new(false, false));
        let extractor = Extractor::new(client.clone(), cache.clone());

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![
                    image("http://example.com/1.png").with_tags(["thumbnail"]),
                    image("http://example.com/1.png"),
                ],
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();

        assert_eq!(client.call_count("http://example.com/1.png"), 1);
        assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
        assert_eq!(env.result.snippets[0].media, Media::sized(1.0, 1.0));
        assert_eq!(env.result.snippets[1].media, Media::sized(1.0, 1.0));
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_network() {
        let client = Arc::new(MockClient::new());
        let cache = Arc::new(FixedCache(
            json!({
                "ts": Utc::now().timestamp_millis(),
                "ttl": 1000,
                "dimensions": { "width": 1, "height": 1, "wUnits": "px", "hUnits": "px" }
            }),
            Mutex::new(Vec::new()),
        ));
        let extractor = Extractor::new(client.clone(), cache.clone());

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("badurlbadurlbadurlbadurl.png")],
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();

        assert_eq!(env.result.snippets[0].media, Media::sized(1.0, 1.0));
        assert!(client.calls().is_empty());
        assert_eq!(
            *cache.1.lock().unwrap(),
            vec!["image#badurlbadurlbadurlbadurl.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stale_cache_entry_is_refetched() {
        let client = Arc::new(MockClient::new().with_bytes("http://example.com/1.gif", PIXEL_GIF));
        let stale_ts = Utc::now().timestamp_millis() - IMAGE_SIZE_TTL.as_millis() as i64 - 1000;
        let cache = Arc::new(FixedCache(
            json!({
                "ts": stale_ts,
                "dimensions": { "width": 99, "height": 99, "wUnits": "px", "hUnits": "px" }
            }),
            Mutex::new(Vec::new()),
        ));
        let extractor = Extractor::new(client.clone(), cache);

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("http://example.com/1.gif")],
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();

        assert_eq!(env.result.snippets[0].media, Media::sized(1.0, 1.0));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_get_error() {
        let client = Arc::new(MockClient::new().with_bytes("http://example.com/1.jpg", PIXEL_GIF));
        let extractor = Extractor::new(client.clone(), Arc::new(BrokenCache::new(true, false)));

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("http://example.com/1.jpg")],
            },
        );

        let err = ImageSizeStage.run(&mut env).await.unwrap_err();
        assert_eq!(err, EmbedError::Store(StoreError("err".to_string())));
        assert!(client.calls().is_empty());
        assert!(env.result.snippets[0].media.is_empty());
    }

    #[tokio::test]
    async fn test_cache_set_error() {
        let client = Arc::new(MockClient::new().with_bytes("http://example.com/1.jpg", PIXEL_GIF));
        let extractor = Extractor::new(client.clone(), Arc::new(BrokenCache::new(false, true)));

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("http://example.com/1.jpg")],
            },
        );

        let err = ImageSizeStage.run(&mut env).await.unwrap_err();
        assert_eq!(err, EmbedError::Store(StoreError("err".to_string())));
        assert_eq!(client.call_count("http://example.com/1.jpg"), 1);
        assert!(env.result.snippets[0].media.is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_fails_stage_after_all_lookups() {
        let client = Arc::new(
            MockClient::new()
                .with_status(Method::Get, "http://example.com/missing.png", 404)
                .with_bytes("http://example.com/ok.png", PIXEL_GIF),
        );
        let cache = Arc::new(MemoryCache::new());
        let extractor = Extractor::new(client.clone(), cache.clone());

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![
                    image("http://example.com/missing.png"),
                    image("http://example.com/ok.png"),
                ],
            },
        );

        let err = ImageSizeStage.run(&mut env).await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        // The sibling finished and was cached, but nothing was applied.
        assert_eq!(client.calls().len(), 2);
        assert_eq!(cache.len(), 1);
        assert!(env.result.snippets[1].media.is_empty());
    }

    #[tokio::test]
    async fn test_connection_error() {
        let extractor = Extractor::new(Arc::new(MockClient::new()), Arc::new(MemoryCache::new()));

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("badurlbadurlbadurlbadurl.png")],
            },
        );

        let err = ImageSizeStage.run(&mut env).await.unwrap_err();
        assert!(matches!(err, EmbedError::Transport(_)));
    }

    /// Prober that records how many probes overlap.
    #[derive(Default)]
    struct TrackingProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageProber for TrackingProber {
        async fn probe(&self, _url: &str) -> Result<ImageDimensions, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ImageDimensions::px(1.0, 1.0))
        }
    }

    async fn run_with_tracking(config: EmbedConfig, count: usize) -> Arc<TrackingProber> {
        let prober = Arc::new(TrackingProber::default());
        let extractor = Extractor::new(Arc::new(MockClient::new()), Arc::new(MemoryCache::new()))
            .with_prober(prober.clone())
            .with_config(config);

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: (0..count)
                    .map(|i| image(&format!("http://example.com/{}.gif", i)))
                    .collect(),
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();
        assert!(env.result.snippets.iter().all(|s| s.media.has_size()));

        prober
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let prober =
            run_with_tracking(EmbedConfig::default().with_image_size_concurrency(2), 6).await;

        assert_eq!(prober.calls.load(Ordering::SeqCst), 6);
        assert!(prober.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_uncapped_lookups_overlap() {
        let prober = run_with_tracking(EmbedConfig::default(), 6).await;

        assert_eq!(prober.calls.load(Ordering::SeqCst), 6);
        assert_eq!(prober.peak.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_huge_concurrency_setting() {
        let prober =
            run_with_tracking(EmbedConfig::default().with_image_size_concurrency(usize::MAX), 3)
                .await;

        assert_eq!(prober.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_uppercase_extension_is_supported() {
        let client = Arc::new(MockClient::new().with_bytes("http://example.com/A.GIF", PIXEL_GIF));
        let extractor = Extractor::new(client.clone(), Arc::new(MemoryCache::new()));

        let mut env = Environment::new(
            "http://example.com",
            &extractor,
            EmbedResult {
                snippets: vec![image("http://example.com/A.GIF")],
            },
        );

        ImageSizeStage.run(&mut env).await.unwrap();

        assert_eq!(env.result.snippets[0].media, Media::sized(1.0, 1.0));
    }
}
