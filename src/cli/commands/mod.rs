//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a
//! specific pipeline stage.

pub mod completions;
pub mod config;
pub mod crawl;
pub mod full;
pub mod process;
pub mod query;

// Re-export argument types for use in mod.rs
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use crawl::CrawlArgs;
pub use full::FullArgs;
pub use process::ProcessArgs;
pub use query::QueryArgs;
