//! Core pipeline: crawling, chunking, indexing and retrieval.

pub mod chunker;
pub mod config;
pub mod crawler;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod index;
pub mod retriever;
pub mod services;
pub mod snapshot;
pub mod synthesis;
pub mod types;
pub mod vector_store;

pub use config::Config;
pub use error::{Result, SiteragError};
pub use services::Services;
