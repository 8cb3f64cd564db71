//! Shared service container.
//!
//! Wires configuration into the concrete embedder, vector store,
//! index set and retriever, and hands the bundle to the HTTP
//! handlers and CLI commands as one `Arc`.

use std::sync::Arc;

use crate::core::config::{Config, StorageBackend};
use crate::core::crawler::Crawler;
use crate::core::embedding::{EmbeddingClient, OpenAiEmbedder};
use crate::core::error::Result;
use crate::core::index::IndexSet;
use crate::core::retriever::Retriever;
use crate::core::synthesis::{AnswerSynthesizer, ExtractiveSynthesizer};
use crate::core::vector_store::{InMemoryStore, QdrantStore, VectorStore};

pub struct Services {
    pub config: Config,
    pub indexes: Arc<IndexSet>,
    pub retriever: Retriever,
}

impl Services {
    /// Build the service graph from configuration.
    ///
    /// Fails fast on invalid configuration (missing API key, bad
    /// weights) rather than at first use.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let embedder: Arc<dyn EmbeddingClient> =
            Arc::new(OpenAiEmbedder::new(&config.embedding)?);

        let store: Arc<dyn VectorStore> = match config.storage.backend {
            StorageBackend::Qdrant => Arc::new(QdrantStore::new(&config.storage)?),
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        };

        let synthesizer: Arc<dyn AnswerSynthesizer> = Arc::new(ExtractiveSynthesizer::new());

        let indexes = Arc::new(IndexSet::new(embedder, store, config.clone()));
        let retriever = Retriever::new(
            Arc::clone(&indexes),
            synthesizer,
            config.retrieval.clone(),
        )?;

        Ok(Self {
            config,
            indexes,
            retriever,
        })
    }

    /// Crawler configured from the crawl section.
    pub fn crawler(&self) -> Result<Crawler> {
        Crawler::new(self.config.crawl.clone())
    }
}
