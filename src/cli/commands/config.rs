//! Config command - show current configuration

use crate::cli::output::print_output;
use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

/// Configuration response (secrets redacted)
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub crawl: CrawlView,
    pub chunking: ChunkingView,
    pub embedding: EmbeddingView,
    pub storage: StorageView,
    pub retrieval: RetrievalView,
}

#[derive(Debug, Serialize)]
pub struct CrawlView {
    pub seed_url: String,
    pub max_pages: usize,
    pub max_depth: usize,
    pub concurrency: usize,
    pub politeness_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ChunkingView {
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingView {
    pub base_url: String,
    pub model: String,
    pub api_key_set: bool,
    pub batch_size: usize,
}

#[derive(Debug, Serialize)]
pub struct StorageView {
    pub backend: String,
    pub qdrant_url: String,
    pub collection: String,
}

#[derive(Debug, Serialize)]
pub struct RetrievalView {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub min_score: f32,
    pub dense_weight: f32,
    pub keyword_weight: f32,
}

/// Execute the config command
pub async fn execute(
    _args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &services.config;

    let response = ConfigResponse {
        crawl: CrawlView {
            seed_url: config.crawl.seed_url.clone(),
            max_pages: config.crawl.max_pages,
            max_depth: config.crawl.max_depth,
            concurrency: config.crawl.concurrency,
            politeness_ms: config.crawl.politeness_ms,
        },
        chunking: ChunkingView {
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
        },
        embedding: EmbeddingView {
            base_url: config.embedding.base_url.clone(),
            model: config.embedding.model.clone(),
            api_key_set: config.embedding.api_key.is_some(),
            batch_size: config.embedding.batch_size,
        },
        storage: StorageView {
            backend: format!("{:?}", config.storage.backend).to_lowercase(),
            qdrant_url: config.storage.qdrant_url.clone(),
            collection: config.storage.collection.clone(),
        },
        retrieval: RetrievalView {
            default_top_k: config.retrieval.default_top_k,
            max_top_k: config.retrieval.max_top_k,
            min_score: config.retrieval.min_score,
            dense_weight: config.retrieval.dense_weight,
            keyword_weight: config.retrieval.keyword_weight,
        },
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  crawl:");
            println!("    seed_url: {}", response.crawl.seed_url);
            println!("    max_pages: {}", response.crawl.max_pages);
            println!("    max_depth: {}", response.crawl.max_depth);
            println!("    concurrency: {}", response.crawl.concurrency);
            println!("    politeness_ms: {}", response.crawl.politeness_ms);
            println!("  chunking:");
            println!("    chunk_size: {}", response.chunking.chunk_size);
            println!("    overlap: {}", response.chunking.overlap);
            println!("  embedding:");
            println!("    base_url: {}", response.embedding.base_url);
            println!("    model: {}", response.embedding.model);
            println!("    api_key_set: {}", response.embedding.api_key_set);
            println!("    batch_size: {}", response.embedding.batch_size);
            println!("  storage:");
            println!("    backend: {}", response.storage.backend);
            println!("    qdrant_url: {}", response.storage.qdrant_url);
            println!("    collection: {}", response.storage.collection);
            println!("  retrieval:");
            println!("    default_top_k: {}", response.retrieval.default_top_k);
            println!("    max_top_k: {}", response.retrieval.max_top_k);
            println!("    min_score: {}", response.retrieval.min_score);
            println!("    dense_weight: {}", response.retrieval.dense_weight);
            println!("    keyword_weight: {}", response.retrieval.keyword_weight);
        }
        OutputFormat::Json => print_output(&response, format),
    }

    Ok(())
}
