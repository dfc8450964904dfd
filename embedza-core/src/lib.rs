pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod http;
pub mod pipeline;
pub mod probe;
pub mod types;

pub use cache::{Cache, CacheStats, DiskCache, MemoryCache, NoCache};
pub use config::{CacheBackend, ConfigError, EmbedConfig};
pub use error::{EmbedError, StoreError, TransportError};
pub use extractor::Extractor;
pub use http::{
    HttpClient, HttpResponse, Method, MockClient, MockResponse, ReqwestClient, RequestOptions,
};
pub use pipeline::{run_stages, Environment, FnStage, Stage, StageMetadata, StageRegistry};
pub use probe::{sniff_dimensions, HttpProber, ImageProber, ProbeError};
pub use types::{EmbedResult, ImageDimensions, Media, MediaValue, Snippet, Tags};
