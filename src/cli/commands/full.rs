//! Full command - crawl, index and optionally query in one run

use crate::cli::output::{colors, format_duration_colored, print_output};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::snapshot::save_pages;
use crate::core::types::RetrievalMode;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the full command
#[derive(Args, Debug)]
pub struct FullArgs {
    /// Seed URL to crawl from (falls back to configuration)
    pub seed: Option<String>,

    /// Maximum number of pages to fetch
    #[arg(long, short = 'n')]
    pub max_pages: Option<usize>,

    /// Maximum link depth from the seed
    #[arg(long, short = 'd')]
    pub max_depth: Option<usize>,

    /// Also save the fetched pages to a snapshot file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Question to answer once indexing completes
    #[arg(long, short = 'q')]
    pub question: Option<String>,

    /// Retrieval mode for the question
    #[arg(long, short = 'm', default_value = "hybrid")]
    pub mode: RetrievalMode,
}

/// Full pipeline output
#[derive(Debug, Serialize)]
pub struct FullOutput {
    pub seed: String,
    pub pages_fetched: usize,
    pub chunks_indexed: usize,
    pub crawl_ms: u64,
    pub index_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<crate::core::types::Answer>,
}

/// Execute the full command
pub async fn execute(
    args: FullArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut crawl_config = services.config.crawl.clone();
    if let Some(max_pages) = args.max_pages {
        crawl_config.max_pages = max_pages;
    }
    if let Some(max_depth) = args.max_depth {
        crawl_config.max_depth = max_depth;
    }

    let seed = args
        .seed
        .clone()
        .or_else(|| {
            (!crawl_config.seed_url.is_empty()).then(|| crawl_config.seed_url.clone())
        })
        .ok_or("No seed URL given (pass one or set crawl.seed_url in the config)")?;

    let crawler = crate::core::crawler::Crawler::new(crawl_config)?;
    let (pages, crawl_stats) = crawler.crawl(&seed).await?;

    if let Some(path) = &args.output {
        save_pages(path, &pages)?;
    }

    let build_stats = services.indexes.rebuild(&pages).await?;

    let answer = match &args.question {
        Some(question) => Some(
            services
                .retriever
                .answer(question, args.mode, None, None)
                .await?,
        ),
        None => None,
    };

    let output = FullOutput {
        seed,
        pages_fetched: crawl_stats.pages_fetched,
        chunks_indexed: build_stats.chunks_indexed,
        crawl_ms: crawl_stats.duration_ms,
        index_ms: build_stats.duration_ms,
        answer,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "Crawled {} page(s) in {}, indexed {} chunk(s) in {}",
                colors::number(&output.pages_fetched.to_string()),
                format_duration_colored(output.crawl_ms as f64 / 1000.0),
                colors::number(&output.chunks_indexed.to_string()),
                format_duration_colored(output.index_ms as f64 / 1000.0),
            );
            if let Some(answer) = &output.answer {
                println!();
                super::query::print_answer(answer);
            }
        }
        OutputFormat::Json => print_output(&output, format),
    }

    Ok(())
}
