//! Crawl command - fetch a website into a page snapshot

use crate::cli::output::{colors, format_duration_colored, print_output};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::snapshot::save_pages;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the crawl command
#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Seed URL to crawl from (falls back to configuration)
    pub seed: Option<String>,

    /// Maximum number of pages to fetch
    #[arg(long, short = 'n')]
    pub max_pages: Option<usize>,

    /// Maximum link depth from the seed
    #[arg(long, short = 'd')]
    pub max_depth: Option<usize>,

    /// Snapshot file to write the fetched pages to
    #[arg(long, short = 'o', default_value = "pages.json")]
    pub output: PathBuf,
}

/// Crawl command output
#[derive(Debug, Serialize)]
pub struct CrawlOutput {
    pub seed: String,
    pub pages_fetched: usize,
    pub urls_visited: usize,
    pub duration_ms: u64,
    pub snapshot: String,
}

/// Execute the crawl command
pub async fn execute(
    args: CrawlArgs,
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
    let (pages, stats) = crawler.crawl(&seed).await?;

    save_pages(&args.output, &pages)?;

    let output = CrawlOutput {
        seed,
        pages_fetched: stats.pages_fetched,
        urls_visited: stats.urls_visited,
        duration_ms: stats.duration_ms,
        snapshot: args.output.display().to_string(),
    };

    match format {
        OutputFormat::Human => {
            println!(
                "Crawled {} page(s) from {} ({} URLs visited) in {}",
                colors::number(&output.pages_fetched.to_string()),
                colors::url(&output.seed),
                colors::number(&output.urls_visited.to_string()),
                format_duration_colored(output.duration_ms as f64 / 1000.0),
            );
            println!("Snapshot written to {}", colors::label(&output.snapshot));
        }
        OutputFormat::Json => print_output(&output, format),
    }

    Ok(())
}
