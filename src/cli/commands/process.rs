//! Process command - chunk and index pages from a snapshot

use crate::cli::output::{colors, format_duration_colored, print_output};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::snapshot::load_pages;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Snapshot file written by the crawl command
    #[arg(long, short = 'i', default_value = "pages.json")]
    pub input: PathBuf,
}

/// Process command output
#[derive(Debug, Serialize)]
pub struct ProcessOutput {
    pub pages: usize,
    pub chunks_indexed: usize,
    pub snapshot_version: u64,
    pub duration_ms: u64,
}

/// Execute the process command
pub async fn execute(
    args: ProcessArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages = load_pages(&args.input)?;
    let stats = services.indexes.rebuild(&pages).await?;

    let output = ProcessOutput {
        pages: stats.pages,
        chunks_indexed: stats.chunks_indexed,
        snapshot_version: stats.snapshot_version,
        duration_ms: stats.duration_ms,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "Indexed {} chunk(s) from {} page(s) in {}",
                colors::number(&output.chunks_indexed.to_string()),
                colors::number(&output.pages.to_string()),
                format_duration_colored(output.duration_ms as f64 / 1000.0),
            );
        }
        OutputFormat::Json => print_output(&output, format),
    }

    Ok(())
}
