//! Index pair and atomic snapshot management.
//!
//! A snapshot bundles the dense and sparse indexes built from the
//! same corpus version. `IndexSet` holds the current snapshot behind
//! a swap: rebuilds construct a complete replacement off to the
//! side, then publish it in one step, so queries always see a
//! consistent pair and never a half-built index.

pub mod dense;
pub mod sparse;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::core::chunker::Chunker;
use crate::core::config::Config;
use crate::core::embedding::EmbeddingClient;
use crate::core::error::{Result, SiteragError};
use crate::core::types::{BuildStats, Chunk, Page};
use crate::core::vector_store::VectorStore;

use dense::DenseIndex;
use sparse::SparseIndex;

/// Both indexes built from one corpus version.
pub struct IndexSnapshot {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub dense: DenseIndex,
    pub sparse: SparseIndex,
    chunks: HashMap<String, Chunk>,
}

impl IndexSnapshot {
    pub fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Holder of the current snapshot.
///
/// Readers take an `Arc` to the snapshot and keep using it even
/// while a rebuild publishes a newer one.
pub struct IndexSet {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    config: Config,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    next_version: AtomicU64,
}

impl IndexSet {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        config: Config,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
            current: RwLock::new(None),
            next_version: AtomicU64::new(1),
        }
    }

    /// The current snapshot, or `IndexNotBuilt` when no build has
    /// completed yet.
    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.current
            .read()
            .map_err(|_| SiteragError::IndexNotBuilt)?
            .clone()
            .ok_or(SiteragError::IndexNotBuilt)
    }

    /// Current snapshot version, if any.
    pub fn version(&self) -> Option<u64> {
        self.current
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.version))
    }

    /// Chunk pages and rebuild both indexes, publishing the new
    /// snapshot only after both complete.
    pub async fn rebuild(&self, pages: &[Page]) -> Result<BuildStats> {
        let start = Instant::now();

        let chunker = Chunker::new(
            self.config.chunking.chunk_size,
            self.config.chunking.overlap,
        )?;
        let chunks: Vec<Chunk> = pages.iter().flat_map(|p| chunker.chunk_page(p)).collect();

        tracing::info!("Rebuilding indexes: {} pages, {} chunks", pages.len(), chunks.len());

        let dense = DenseIndex::build(
            Arc::clone(&self.embedder),
            Arc::clone(&self.store),
            self.config.embedding.batch_size,
            &chunks,
        )
        .await?;
        let sparse = SparseIndex::build(
            &chunks,
            self.config.retrieval.bm25_k1,
            self.config.retrieval.bm25_b,
        );

        let stats = BuildStats {
            pages: pages.len(),
            chunks_indexed: chunks.len(),
            snapshot_version: self.publish(dense, sparse, chunks),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Published snapshot v{} ({} chunks in {}ms)",
            stats.snapshot_version,
            stats.chunks_indexed,
            stats.duration_ms
        );

        Ok(stats)
    }

    /// Restore a snapshot from chunks already persisted in the
    /// vector store, rebuilding only the sparse index.
    ///
    /// Lets a new process answer queries against an existing
    /// collection without re-crawling or re-embedding.
    pub async fn restore(&self) -> Result<BuildStats> {
        let start = Instant::now();

        let chunks = self.store.scroll_all().await?;
        if chunks.is_empty() {
            return Err(SiteragError::IndexNotBuilt);
        }

        let dense = DenseIndex::attach(
            Arc::clone(&self.embedder),
            Arc::clone(&self.store),
            self.config.embedding.batch_size,
            chunks.len(),
        );
        let sparse = SparseIndex::build(
            &chunks,
            self.config.retrieval.bm25_k1,
            self.config.retrieval.bm25_b,
        );

        let stats = BuildStats {
            pages: 0,
            chunks_indexed: chunks.len(),
            snapshot_version: self.publish(dense, sparse, chunks),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Restored snapshot v{} from store ({} chunks)",
            stats.snapshot_version,
            stats.chunks_indexed
        );

        Ok(stats)
    }

    fn publish(&self, dense: DenseIndex, sparse: SparseIndex, chunks: Vec<Chunk>) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::AcqRel);
        let snapshot = Arc::new(IndexSnapshot {
            version,
            created_at: Utc::now(),
            dense,
            sparse,
            chunks: chunks.into_iter().map(|c| (c.id.clone(), c)).collect(),
        });

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(snapshot);
        version
    }
}
