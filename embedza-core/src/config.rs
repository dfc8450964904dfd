//! Extractor configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DiskCache;
use crate::http::DEFAULT_MAX_BODY_BYTES;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Which cache backend to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    None,
    Memory,
    Disk(PathBuf),
}

#[derive(Debug, Clone)]
pub struct EmbedConfig {
    pub cache: CacheBackend,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    /// Milliseconds between requests to the same host. 0 disables.
    pub rate_limit_ms: u64,
    /// Max concurrent dimension lookups per pass. `None` means one task
    /// per distinct image URL.
    pub image_size_concurrency: Option<usize>,
    /// Response bodies are read up to this many bytes.
    pub max_probe_bytes: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            cache: CacheBackend::Memory,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            rate_limit_ms: 0,
            image_size_concurrency: None,
            max_probe_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl EmbedConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `EMBEDZA_CACHE`: "none", "memory" (default), "disk", or a directory path
    /// - `EMBEDZA_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `EMBEDZA_USER_AGENT`: user agent override
    /// - `EMBEDZA_RATE_LIMIT_MS`: per-host delay (default: 0)
    /// - `EMBEDZA_IMAGE_SIZE_CONCURRENCY`: cap on parallel image lookups
    /// - `EMBEDZA_MAX_PROBE_BYTES`: body read limit (default: 10MB)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache = match lookup("EMBEDZA_CACHE").as_deref() {
            None | Some("memory") => CacheBackend::Memory,
            Some("none") => CacheBackend::None,
            Some("disk") => CacheBackend::Disk(DiskCache::default_dir()),
            Some(path) => CacheBackend::Disk(PathBuf::from(path)),
        };

        let timeout = parse_var(&lookup, "EMBEDZA_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let rate_limit_ms =
            parse_var(&lookup, "EMBEDZA_RATE_LIMIT_MS")?.unwrap_or(defaults.rate_limit_ms);

        let image_size_concurrency: Option<usize> =
            parse_var(&lookup, "EMBEDZA_IMAGE_SIZE_CONCURRENCY")?;
        if image_size_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "EMBEDZA_IMAGE_SIZE_CONCURRENCY".to_string(),
                value: "0".to_string(),
            });
        }

        let max_probe_bytes =
            parse_var(&lookup, "EMBEDZA_MAX_PROBE_BYTES")?.unwrap_or(defaults.max_probe_bytes);

        Ok(Self {
            cache,
            timeout,
            user_agent: lookup("EMBEDZA_USER_AGENT"),
            rate_limit_ms,
            image_size_concurrency,
            max_probe_bytes,
        })
    }

    pub fn with_cache(mut self, cache: CacheBackend) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_image_size_concurrency(mut self, limit: usize) -> Self {
        self.image_size_concurrency = Some(limit.max(1));
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
    }
}
