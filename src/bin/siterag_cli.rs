//! siterag CLI - Command-line interface for the website RAG pipeline
//!
//! Drives the crawl, index and query stages directly, without the
//! HTTP server. Use this for scripting, automation, or one-off runs.
//!
//! # Examples
//!
//! ```bash
//! # Crawl a site into a snapshot
//! siterag crawl https://example.com --max-pages 25 -o pages.json
//!
//! # Chunk and index the snapshot
//! siterag process -i pages.json
//!
//! # Ask a question
//! siterag query "what does the product do?" --mode hybrid
//!
//! # Everything in one run
//! siterag full https://example.com -q "what does the product do?"
//! ```

use clap::Parser;
use siterag::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
