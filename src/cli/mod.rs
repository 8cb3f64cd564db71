//! CLI adapter for siterag
//!
//! Drives the pipeline stages from the command line. This module is
//! parallel to `http/` - both depend on `core/` but not on each
//! other.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!          +------------+------------+
//!          |                         |
//!          v                         v
//! +------------------+      +------------------+
//! |      http/       |      |      cli/        |
//! | (axum adapter)   |      | (clap adapter)   |
//! +------------------+      +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// siterag - Website RAG pipeline
///
/// Crawl a website, index its content with dense embeddings and
/// BM25, and answer questions about it with source citations.
#[derive(Parser, Debug)]
#[command(name = "siterag")]
#[command(version)]
#[command(about = "Crawl a website and answer questions about it", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output for scripting
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Human
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website and save the pages to a snapshot file
    Crawl(commands::CrawlArgs),

    /// Chunk and index pages from a snapshot file
    Process(commands::ProcessArgs),

    /// Answer a question against the indexed corpus
    Query(commands::QueryArgs),

    /// Run the whole pipeline: crawl, index, optionally query
    Full(commands::FullArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  siterag completions bash > ~/.local/share/bash-completion/completions/siterag
    ///   zsh:   siterag completions zsh > ~/.zfunc/_siterag
    ///   fish:  siterag completions fish > ~/.config/fish/completions/siterag.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    // Load configuration
    let config = Config::load()?;

    // Create services
    let services = Arc::new(Services::new(config)?);

    // Execute command
    match cli.command {
        Commands::Crawl(args) => commands::crawl::execute(args, &services, cli.format).await,
        Commands::Process(args) => commands::process::execute(args, &services, cli.format).await,
        Commands::Query(args) => commands::query::execute(args, &services, cli.format).await,
        Commands::Full(args) => commands::full::execute(args, &services, cli.format).await,
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
