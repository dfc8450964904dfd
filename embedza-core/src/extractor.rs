//! The extractor owns the collaborators every stage can reach through
//! `Environment::extractor`: request capability, cache, prober and config.

use std::sync::Arc;

use crate::cache::{Cache, DiskCache, MemoryCache, NoCache};
use crate::config::{CacheBackend, EmbedConfig};
use crate::error::{EmbedError, TransportError};
use crate::http::{HttpClient, HttpResponse, ReqwestClient, RequestOptions};
use crate::pipeline::{run_stages, Environment, Stage, StageRegistry};
use crate::probe::{HttpProber, ImageProber};
use crate::types::{EmbedResult, Snippet};

pub struct Extractor {
    client: Arc<dyn HttpClient>,
    cache: Arc<dyn Cache>,
    prober: Arc<dyn ImageProber>,
    config: EmbedConfig,
    stages: StageRegistry,
}

impl Extractor {
    /// Extractor with the built-in stages and default config. Images are
    /// probed through `client`.
    pub fn new(client: Arc<dyn HttpClient>, cache: Arc<dyn Cache>) -> Self {
        let prober: Arc<dyn ImageProber> = Arc::new(HttpProber::new(Arc::clone(&client)));
        Self {
            client,
            cache,
            prober,
            config: EmbedConfig::default(),
            stages: StageRegistry::builtin(),
        }
    }

    /// Build a production extractor: reqwest client and the configured cache.
    pub fn from_config(config: EmbedConfig) -> Result<Self, TransportError> {
        let mut builder = ReqwestClient::builder()
            .timeout(config.timeout)
            .rate_limit_ms(config.rate_limit_ms)
            .max_body_bytes(config.max_probe_bytes);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client: Arc<dyn HttpClient> = Arc::new(builder.build()?);

        let cache: Arc<dyn Cache> = match &config.cache {
            CacheBackend::None => Arc::new(NoCache),
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Disk(dir) => Arc::new(DiskCache::new(dir.clone())),
        };

        tracing::debug!(cache = ?config.cache, timeout_secs = config.timeout.as_secs(), "extractor ready");

        Ok(Self::new(client, cache).with_config(config))
    }

    pub fn with_prober(mut self, prober: Arc<dyn ImageProber>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_config(mut self, config: EmbedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_stages(mut self, stages: StageRegistry) -> Self {
        self.stages = stages;
        self
    }

    pub fn stages(&self) -> &StageRegistry {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut StageRegistry {
        &mut self.stages
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn prober(&self) -> &Arc<dyn ImageProber> {
        &self.prober
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Issue a request through the configured client.
    pub async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError> {
        self.client.request(url, options).await
    }

    /// Run the registered stages over `snippets` extracted from `src`.
    pub async fn post_process(
        &self,
        src: &str,
        snippets: Vec<Snippet>,
    ) -> Result<EmbedResult, EmbedError> {
        self.post_process_with(src, snippets, self.stages.ordered())
            .await
    }

    /// Run an explicit stage list instead of the registry.
    pub async fn post_process_with(
        &self,
        src: &str,
        snippets: Vec<Snippet>,
        stages: &[Arc<dyn Stage>],
    ) -> Result<EmbedResult, EmbedError> {
        let env = Environment::new(src, self, EmbedResult { snippets });
        let env = run_stages(stages, env).await?;
        Ok(env.result)
    }
}
