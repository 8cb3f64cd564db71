//! Dense vector index over chunk embeddings.
//!
//! Thin orchestration layer tying the embedding client to the
//! vector store: builds embed the corpus in batches and replace the
//! backing collection, queries embed the question and delegate the
//! similarity search.

use std::sync::Arc;

use crate::core::embedding::EmbeddingClient;
use crate::core::error::{Result, SiteragError};
use crate::core::types::Chunk;
use crate::core::vector_store::{StoredPoint, VectorStore};

pub struct DenseIndex {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    chunks: usize,
}

impl DenseIndex {
    /// Embed `chunks` and build a fresh collection holding them.
    ///
    /// The previous collection contents are replaced only after the
    /// first batch embeds successfully, so an unreachable embedding
    /// API leaves the store untouched.
    pub async fn build(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
        chunks: &[Chunk],
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(SiteragError::Content(
                "No chunks to index; crawl produced no content".to_string(),
            ));
        }

        let mut replaced = false;
        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            if !replaced {
                let dim = vectors.first().map(Vec::len).ok_or_else(|| {
                    SiteragError::EmbeddingUnavailable("Empty embedding batch".to_string())
                })?;
                store.replace_collection(dim).await?;
                replaced = true;
            }

            let points: Vec<StoredPoint> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| StoredPoint {
                    chunk: chunk.clone(),
                    vector,
                })
                .collect();
            store.upsert(&points).await?;
        }

        tracing::info!("Dense index built with {} chunks", chunks.len());

        Ok(Self {
            embedder,
            store,
            batch_size,
            chunks: chunks.len(),
        })
    }

    /// Attach to an already-populated collection without embedding.
    pub fn attach(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
        chunks: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size,
            chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    /// Embed the question and return the nearest chunks with their
    /// cosine scores, best first.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<Vec<(Chunk, f32)>> {
        let vectors = self.embedder.embed(&[question.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            SiteragError::EmbeddingUnavailable("No vector returned for query".to_string())
        })?;
        self.store.search(&vector, top_k).await
    }

    /// All chunk payloads from the backing store.
    pub async fn fetch_all(&self) -> Result<Vec<Chunk>> {
        self.store.scroll_all().await
    }

    /// Batch size used for builds; exposed for restore paths.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
