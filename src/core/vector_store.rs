//! Vector storage backends.
//!
//! `VectorStore` abstracts the persistence layer for dense vectors:
//! a Qdrant REST backend for real deployments and an in-memory
//! backend for tests and API-key-less development. Point payloads
//! carry the full chunk, so an index can be restored from the store
//! without re-embedding.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::StorageConfig;
use crate::core::error::{Result, SiteragError};
use crate::core::types::Chunk;

/// A vector plus the chunk it embeds.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Persistence backend for dense vectors and their chunk payloads.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop and recreate the collection for vectors of `dim`.
    async fn replace_collection(&self, dim: usize) -> Result<()>;

    /// Upsert points into the collection.
    async fn upsert(&self, points: &[StoredPoint]) -> Result<()>;

    /// Nearest chunks to `vector` by cosine similarity, best first.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<(Chunk, f32)>>;

    /// All chunk payloads in the collection.
    async fn scroll_all(&self) -> Result<Vec<Chunk>>;

    /// Number of points in the collection.
    async fn count(&self) -> Result<usize>;
}

/// Stable 64-bit point id for a chunk id.
///
/// Qdrant point ids must be unsigned integers or UUIDs; FNV-1a over
/// the chunk id gives a deterministic mapping, and the authoritative
/// chunk id travels in the payload.
fn point_id(chunk_id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in chunk_id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

// ---------------------------------------------------------------------------
// Qdrant REST backend

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    max_retries: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    payload: Chunk,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    payload: Chunk,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Serialize)]
struct UpsertPoint<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a Chunk,
}

impl QdrantStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()
            .map_err(|e| SiteragError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{suffix}", self.base_url, self.collection)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("api-key", key),
            None => req,
        }
    }

    /// Send a request, retrying transient failures, and return the
    /// successful response.
    async fn send(&self, build: impl Fn() -> reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut attempt = 0usize;
        loop {
            let outcome = self.apply_auth(build()).send().await;
            match outcome {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    let detail = resp.text().await.unwrap_or_default();
                    return Err(SiteragError::StorageUnavailable(format!(
                        "Qdrant returned {status}: {detail}"
                    )));
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(SiteragError::StorageUnavailable(format!(
                        "Qdrant request failed: {err}"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn replace_collection(&self, dim: usize) -> Result<()> {
        // Delete is idempotent; a missing collection is fine.
        let url = self.collection_url("");
        let resp = self.apply_auth(self.client.delete(&url)).send().await;
        if let Err(err) = resp {
            return Err(SiteragError::StorageUnavailable(format!(
                "Qdrant delete failed: {err}"
            )));
        }

        let body = json!({
            "vectors": { "size": dim, "distance": "Cosine" }
        });
        self.send(|| self.client.put(&url).json(&body)).await?;
        tracing::info!("Recreated Qdrant collection '{}' (dim {dim})", self.collection);
        Ok(())
    }

    async fn upsert(&self, points: &[StoredPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let url = self.collection_url("/points?wait=true");
        let upserts: Vec<UpsertPoint<'_>> = points
            .iter()
            .map(|p| UpsertPoint {
                id: point_id(&p.chunk.id),
                vector: &p.vector,
                payload: &p.chunk,
            })
            .collect();
        let body = json!({ "points": upserts });
        self.send(|| self.client.put(&url).json(&body)).await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<(Chunk, f32)>> {
        let url = self.collection_url("/points/search");
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true
        });
        let resp = self.send(|| self.client.post(&url).json(&body)).await?;
        let parsed: SearchResponse = resp.json().await.map_err(|e| {
            SiteragError::StorageUnavailable(format!("Malformed search response: {e}"))
        })?;
        Ok(parsed
            .result
            .into_iter()
            .map(|p| (p.payload, p.score))
            .collect())
    }

    async fn scroll_all(&self) -> Result<Vec<Chunk>> {
        let url = self.collection_url("/points/scroll");
        let mut chunks = Vec::new();
        let mut offset: Option<serde_json::Value> = None;

        loop {
            let mut body = json!({
                "limit": 256,
                "with_payload": true,
                "with_vector": false
            });
            if let Some(ref off) = offset {
                body["offset"] = off.clone();
            }

            let resp = self.send(|| self.client.post(&url).json(&body)).await?;
            let parsed: ScrollResponse = resp.json().await.map_err(|e| {
                SiteragError::StorageUnavailable(format!("Malformed scroll response: {e}"))
            })?;

            chunks.extend(parsed.result.points.into_iter().map(|p| p.payload));
            match parsed.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(chunks)
    }

    async fn count(&self) -> Result<usize> {
        let url = self.collection_url("/points/count");
        let body = json!({ "exact": true });
        let resp = self.send(|| self.client.post(&url).json(&body)).await?;
        let parsed: CountResponse = resp.json().await.map_err(|e| {
            SiteragError::StorageUnavailable(format!("Malformed count response: {e}"))
        })?;
        Ok(parsed.result.count)
    }
}

// ---------------------------------------------------------------------------
// In-memory backend

/// Vector store held in process memory.
///
/// Used by tests and by the memory storage backend; contents are
/// lost on process exit.
#[derive(Default)]
pub struct InMemoryStore {
    points: Mutex<HashMap<String, StoredPoint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn replace_collection(&self, _dim: usize) -> Result<()> {
        self.points.lock().expect("points lock").clear();
        Ok(())
    }

    async fn upsert(&self, points: &[StoredPoint]) -> Result<()> {
        let mut stored = self.points.lock().expect("points lock");
        for point in points {
            stored.insert(point.chunk.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<(Chunk, f32)>> {
        let stored = self.points.lock().expect("points lock");
        let mut scored: Vec<(Chunk, f32)> = stored
            .values()
            .map(|p| (p.chunk.clone(), cosine(vector, &p.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn scroll_all(&self) -> Result<Vec<Chunk>> {
        let stored = self.points.lock().expect("points lock");
        let mut chunks: Vec<Chunk> = stored.values().map(|p| p.chunk.clone()).collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.points.lock().expect("points lock").len())
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_url: "https://example.com/".to_string(),
            title: "Home".to_string(),
            sequence_index: 0,
            text: "text".to_string(),
            token_count: 1,
        }
    }

    #[test]
    fn test_point_id_is_stable() {
        let a = point_id("https://example.com/about#0");
        let b = point_id("https://example.com/about#0");
        let c = point_id("https://example.com/about#1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryStore::new();
        store.replace_collection(2).await.unwrap();
        store
            .upsert(&[
                StoredPoint {
                    chunk: chunk("a#0"),
                    vector: vec![1.0, 0.0],
                },
                StoredPoint {
                    chunk: chunk("b#0"),
                    vector: vec![0.0, 1.0],
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let hits = store.search(&[1.0, 0.1], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "a#0");

        let all = store.scroll_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_upsert_overwrites() {
        let store = InMemoryStore::new();
        let mut c = chunk("a#0");
        store
            .upsert(&[StoredPoint {
                chunk: c.clone(),
                vector: vec![1.0],
            }])
            .await
            .unwrap();
        c.text = "updated".to_string();
        store
            .upsert(&[StoredPoint {
                chunk: c,
                vector: vec![0.5],
            }])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let all = store.scroll_all().await.unwrap();
        assert_eq!(all[0].text, "updated");
    }

    #[tokio::test]
    async fn test_replace_collection_clears() {
        let store = InMemoryStore::new();
        store
            .upsert(&[StoredPoint {
                chunk: chunk("a#0"),
                vector: vec![1.0],
            }])
            .await
            .unwrap();
        store.replace_collection(1).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
