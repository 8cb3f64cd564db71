//! Query command - answer a question against the indexed corpus

use crate::cli::output::{colors, print_output};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::types::{Answer, RetrievalMode};
use clap::Args;
use std::sync::Arc;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Natural-language question
    pub question: String,

    /// Retrieval mode: semantic, keyword or hybrid
    #[arg(long, short = 'm', default_value = "hybrid")]
    pub mode: RetrievalMode,

    /// Number of results to retrieve
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Minimum normalized score in [0, 1]
    #[arg(long)]
    pub min_score: Option<f32>,
}

/// Execute the query command
pub async fn execute(
    args: QueryArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Queries run against the chunks persisted in the vector store,
    // so a fresh process restores its snapshot from there.
    services.indexes.restore().await?;

    let answer = services
        .retriever
        .answer(&args.question, args.mode, args.top_k, args.min_score)
        .await?;

    match format {
        OutputFormat::Human => print_answer(&answer),
        OutputFormat::Json => print_output(&answer, format),
    }

    Ok(())
}

pub(crate) fn print_answer(answer: &Answer) {
    if answer.is_no_answer() {
        println!("{}", colors::warning(&answer.answer));
        return;
    }

    if answer.answer.is_empty() {
        println!("{}", colors::dim("(no answer text; sources below)"));
    } else {
        println!("{}", answer.answer);
    }
    println!();
    println!(
        "{} {}",
        colors::label("Confidence:"),
        colors::score(&format!("{:.3}", answer.confidence))
    );
    println!("{}", colors::label("Sources:"));
    for (i, source) in answer.sources.iter().enumerate() {
        let title = if source.title.is_empty() {
            "(untitled)"
        } else {
            &source.title
        };
        println!(
            "  [{}] {} {} {}",
            colors::rank(&(i + 1).to_string()),
            colors::score(&format!("{:.3}", source.score)),
            title,
            colors::url(&source.url),
        );
    }
}
