//! Configuration management for the siterag service.
//!
//! Loads configuration from TOML files and environment variables
//! with sensible defaults, and validates everything fail-fast
//! before any crawling, indexing or querying starts.

use crate::core::error::{Result, SiteragError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Seed URL for the crawl (may be overridden per invocation)
    #[serde(default)]
    pub seed_url: String,

    /// Maximum number of successful page fetches (hard cap)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between requests to the same host, in milliseconds
    #[serde(default = "default_politeness_ms")]
    pub politeness_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub request_timeout_sec: u64,

    /// Retry attempts for transient fetch failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Maximum links followed from any single page
    #[serde(default = "default_max_links_per_page")]
    pub max_links_per_page: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Tokens per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Token overlap between consecutive chunks (must be < chunk_size)
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

/// Embedding service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings API
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (usually via OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional dimension override supported by some models
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Texts per embedding request
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_embed_timeout")]
    pub request_timeout_sec: u64,

    /// Retry attempts for transient embedding failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// Vector storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Qdrant over its REST API
    Qdrant,
    /// In-process store (testing and single-shot pipelines)
    Memory,
}

/// Vector storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Which backend to use
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    /// Qdrant base URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Optional Qdrant API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection name (the corpus identifier)
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_storage_timeout")]
    pub request_timeout_sec: u64,

    /// Retry attempts for transient storage failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default number of results to retrieve
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Maximum results per query
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Default minimum normalized score in [0, 1]
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// BM25 term-frequency saturation parameter
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,

    /// BM25 length normalization parameter
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,

    /// Weight of the dense score in hybrid fusion
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,

    /// Weight of the keyword score in hybrid fusion
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional page snapshot to index at startup
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

// Default value functions
fn default_max_pages() -> usize {
    25
}

fn default_max_depth() -> usize {
    3
}

fn default_concurrency() -> usize {
    4
}

fn default_politeness_ms() -> u64 {
    1000
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_retries() -> usize {
    3
}

fn default_max_links_per_page() -> usize {
    50
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    50
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embed_batch_size() -> usize {
    100
}

fn default_embed_timeout() -> u64 {
    30
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Qdrant
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "site_documents".to_string()
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    50
}

fn default_min_score() -> f32 {
    0.3
}

fn default_bm25_k1() -> f32 {
    1.5
}

fn default_bm25_b() -> f32 {
    0.75
}

fn default_dense_weight() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            politeness_ms: default_politeness_ms(),
            request_timeout_sec: default_fetch_timeout(),
            max_retries: default_max_retries(),
            max_links_per_page: default_max_links_per_page(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            api_key: None,
            dimensions: None,
            batch_size: default_embed_batch_size(),
            request_timeout_sec: default_embed_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            qdrant_url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            request_timeout_sec: default_storage_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            min_score: default_min_score(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
            dense_weight: default_dense_weight(),
            keyword_weight: default_keyword_weight(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            snapshot_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SiteragError::Config(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    ///
    /// File resolution order:
    /// 1. SITERAG_CONFIG env var
    /// 2. ./siterag.toml
    /// 3. {config_dir}/siterag/config.toml
    /// 4. Defaults
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("SITERAG_CONFIG") {
            Self::from_file(config_path)?
        } else if Path::new("siterag.toml").exists() {
            Self::from_file("siterag.toml")?
        } else {
            let user_config = dirs::config_dir().map(|d| d.join("siterag").join("config.toml"));
            match user_config {
                Some(path) if path.exists() => Self::from_file(path)?,
                _ => Self::default(),
            }
        };

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Crawl configuration
        if let Ok(seed) = env::var("SITERAG_SEED_URL") {
            self.crawl.seed_url = seed;
        }
        if let Ok(max_pages) = env::var("SITERAG_MAX_PAGES") {
            if let Ok(n) = max_pages.parse() {
                self.crawl.max_pages = n;
            }
        }
        if let Ok(max_depth) = env::var("SITERAG_MAX_DEPTH") {
            if let Ok(n) = max_depth.parse() {
                self.crawl.max_depth = n;
            }
        }
        if let Ok(politeness) = env::var("SITERAG_POLITENESS_MS") {
            if let Ok(ms) = politeness.parse() {
                self.crawl.politeness_ms = ms;
            }
        }

        // Chunking configuration
        if let Ok(chunk_size) = env::var("SITERAG_CHUNK_SIZE") {
            if let Ok(size) = chunk_size.parse() {
                self.chunking.chunk_size = size;
            }
        }
        if let Ok(overlap) = env::var("SITERAG_OVERLAP") {
            if let Ok(o) = overlap.parse() {
                self.chunking.overlap = o;
            }
        }

        // Embedding configuration
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Ok(base_url) = env::var("SITERAG_EMBEDDING_BASE_URL") {
            self.embedding.base_url = base_url;
        }
        if let Ok(model) = env::var("SITERAG_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        // Storage configuration
        if let Ok(url) = env::var("QDRANT_URL") {
            self.storage.qdrant_url = url;
        }
        if let Ok(key) = env::var("QDRANT_API_KEY") {
            self.storage.api_key = Some(key);
        }
        if let Ok(collection) = env::var("SITERAG_COLLECTION") {
            self.storage.collection = collection;
        }

        // Server configuration
        if let Ok(host) = env::var("SITERAG_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SITERAG_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Crawl config
        if self.crawl.max_pages == 0 {
            return Err(SiteragError::Config(
                "Max pages must be non-zero".to_string(),
            ));
        }
        if self.crawl.concurrency == 0 {
            return Err(SiteragError::Config(
                "Crawl concurrency must be non-zero".to_string(),
            ));
        }
        if self.crawl.request_timeout_sec == 0 {
            return Err(SiteragError::Config(
                "Fetch timeout must be non-zero".to_string(),
            ));
        }

        // Chunking config
        if self.chunking.chunk_size == 0 {
            return Err(SiteragError::Config(
                "Chunk size must be non-zero".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(SiteragError::Config(
                "Overlap must be less than chunk size".to_string(),
            ));
        }

        // Embedding config
        if self.embedding.batch_size == 0 {
            return Err(SiteragError::Config(
                "Embedding batch size must be non-zero".to_string(),
            ));
        }

        // Retrieval config
        if self.retrieval.default_top_k == 0 {
            return Err(SiteragError::Config(
                "Default top_k must be non-zero".to_string(),
            ));
        }
        if self.retrieval.default_top_k > self.retrieval.max_top_k {
            return Err(SiteragError::Config(
                "Default top_k cannot exceed max top_k".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(SiteragError::Config(
                "Min score must be in [0, 1]".to_string(),
            ));
        }
        if self.retrieval.bm25_k1 <= 0.0 {
            return Err(SiteragError::Config(
                "BM25 k1 must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.bm25_b) {
            return Err(SiteragError::Config("BM25 b must be in [0, 1]".to_string()));
        }

        let weight_sum = self.retrieval.dense_weight + self.retrieval.keyword_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(SiteragError::Config(format!(
                "Fusion weights must sum to 1.0 (got {weight_sum})"
            )));
        }

        Ok(())
    }

    /// Log configuration (redacting credentials)
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Max pages: {}", self.crawl.max_pages);
        tracing::info!("  Max depth: {}", self.crawl.max_depth);
        tracing::info!("  Crawl concurrency: {}", self.crawl.concurrency);
        tracing::info!("  Politeness delay: {}ms", self.crawl.politeness_ms);
        tracing::info!("  Chunk size: {} tokens", self.chunking.chunk_size);
        tracing::info!("  Overlap: {} tokens", self.chunking.overlap);
        tracing::info!("  Embedding model: {}", self.embedding.model);
        tracing::info!(
            "  Embedding API key: {}",
            if self.embedding.api_key.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        tracing::info!("  Storage backend: {:?}", self.storage.backend);
        tracing::info!("  Collection: {}", self.storage.collection);
        tracing::info!("  Default top_k: {}", self.retrieval.default_top_k);
        tracing::info!("  Min score: {}", self.retrieval.min_score);
        tracing::info!(
            "  Fusion weights: dense={} keyword={}",
            self.retrieval.dense_weight,
            self.retrieval.keyword_weight
        );
    }
}
