//! siterag: crawl a website and answer questions about it.
//!
//! Pipeline: a breadth-first crawler fetches and cleans site pages,
//! a sentence-aware chunker splits them into overlapping spans, and
//! two indexes are built over the chunks: a dense vector index
//! backed by an embedding API and a vector store, and an in-memory
//! BM25 keyword index. Queries run against either index or both,
//! with hybrid results fused from normalized weighted scores.
//!
//! The crate ships two binaries: `siterag-server`, an HTTP query
//! API, and `siterag`, a CLI driving the crawl/index/query stages.

pub mod cli;
pub mod core;
pub mod http;

pub use crate::core::{Config, Result, Services, SiteragError};
