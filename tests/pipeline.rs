//! End-to-end pipeline tests
//!
//! Runs chunking, indexing and retrieval together over the
//! in-memory vector store and a deterministic embedder, covering
//! all three retrieval modes, rebuild semantics and the restore
//! path.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use siterag::core::config::Config;
use siterag::core::embedding::EmbeddingClient;
use siterag::core::error::Result;
use siterag::core::index::IndexSet;
use siterag::core::retriever::Retriever;
use siterag::core::synthesis::ExtractiveSynthesizer;
use siterag::core::types::{Page, RetrievalMode};
use siterag::core::vector_store::InMemoryStore;
use siterag::SiteragError;

/// Embedder projecting text onto fixed topic axes, so similarity is
/// deterministic and meaningful for test corpora.
struct TopicEmbedder;

const TOPICS: &[&str] = &["screening", "onboarding", "pricing", "monitoring"];

#[async_trait]
impl EmbeddingClient for TopicEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = TOPICS
                    .iter()
                    .map(|topic| lower.matches(topic).count() as f32)
                    .collect();
                v.push(0.1); // keeps zero-topic texts embeddable
                v
            })
            .collect())
    }
}

fn page(url: &str, title: &str, text: &str) -> Page {
    Page {
        url: url.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        fetched_at: Utc::now(),
    }
}

fn corpus() -> Vec<Page> {
    vec![
        page(
            "https://example.com/screening",
            "Screening",
            "Screening checks every transaction against sanctions lists. \
             Screening runs in real time for all customers.",
        ),
        page(
            "https://example.com/onboarding",
            "Onboarding",
            "Onboarding verifies customer documents in minutes. \
             Digital onboarding reduces manual review.",
        ),
        page(
            "https://example.com/pricing",
            "Pricing",
            "Pricing starts at ten dollars per seat. \
             Enterprise pricing includes volume discounts.",
        ),
    ]
}

fn services(store: Arc<InMemoryStore>) -> (Arc<IndexSet>, Retriever) {
    let config = Config::default();
    let indexes = Arc::new(IndexSet::new(
        Arc::new(TopicEmbedder),
        store,
        config.clone(),
    ));
    let retriever = Retriever::new(
        Arc::clone(&indexes),
        Arc::new(ExtractiveSynthesizer::new()),
        config.retrieval,
    )
    .unwrap();
    (indexes, retriever)
}

#[tokio::test]
async fn test_full_pipeline_all_modes() {
    let (indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    let stats = indexes.rebuild(&corpus()).await.unwrap();
    assert_eq!(stats.pages, 3);
    assert!(stats.chunks_indexed >= 3);

    for mode in [
        RetrievalMode::Semantic,
        RetrievalMode::Keyword,
        RetrievalMode::Hybrid,
    ] {
        let answer = retriever
            .answer("how does screening work", mode, None, Some(0.0))
            .await
            .unwrap();
        assert!(!answer.sources.is_empty(), "no sources in {mode} mode");
        assert_eq!(
            answer.sources[0].url, "https://example.com/screening",
            "wrong top source in {mode} mode"
        );
        assert!(answer.confidence > 0.0);
    }
}

#[tokio::test]
async fn test_answer_cites_sources_and_synthesizes() {
    let (indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    indexes.rebuild(&corpus()).await.unwrap();

    let answer = retriever
        .answer("onboarding documents", RetrievalMode::Hybrid, None, Some(0.0))
        .await
        .unwrap();

    assert!(answer.answer.to_lowercase().contains("onboarding"));
    assert_eq!(answer.sources[0].title, "Onboarding");
    assert!(answer.sources[0].score >= answer.sources.last().unwrap().score);
}

#[tokio::test]
async fn test_unrelated_question_gets_no_answer_sentinel() {
    let (indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    indexes.rebuild(&corpus()).await.unwrap();

    let answer = retriever
        .answer(
            "spacecraft propulsion thermodynamics",
            RetrievalMode::Keyword,
            None,
            None,
        )
        .await
        .unwrap();

    assert!(answer.is_no_answer());
    assert_eq!(
        answer.answer,
        "I couldn't find relevant information to answer your question."
    );
}

#[tokio::test]
async fn test_query_before_any_build_is_distinct_error() {
    let (_indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    let result = retriever
        .answer("anything at all", RetrievalMode::Hybrid, None, None)
        .await;
    assert!(matches!(result, Err(SiteragError::IndexNotBuilt)));
}

#[tokio::test]
async fn test_rebuild_replaces_corpus() {
    let (indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    indexes.rebuild(&corpus()).await.unwrap();

    let replacement = vec![page(
        "https://example.com/monitoring",
        "Monitoring",
        "Monitoring watches transactions continuously for anomalies.",
    )];
    let stats = indexes.rebuild(&replacement).await.unwrap();
    assert_eq!(stats.snapshot_version, 2);

    // Old corpus chunks are gone from keyword retrieval.
    let answer = retriever
        .answer("pricing dollars", RetrievalMode::Keyword, None, None)
        .await
        .unwrap();
    assert!(answer.is_no_answer());

    let answer = retriever
        .answer("monitoring anomalies", RetrievalMode::Keyword, None, Some(0.0))
        .await
        .unwrap();
    assert_eq!(answer.sources[0].url, "https://example.com/monitoring");
}

#[tokio::test]
async fn test_indexing_same_pages_twice_is_idempotent() {
    let (indexes, _) = services(Arc::new(InMemoryStore::new()));
    let first = indexes.rebuild(&corpus()).await.unwrap();
    let second = indexes.rebuild(&corpus()).await.unwrap();

    assert_eq!(first.chunks_indexed, second.chunks_indexed);
    assert_eq!(
        indexes.snapshot().unwrap().chunk_count(),
        second.chunks_indexed
    );
}

#[tokio::test]
async fn test_restore_answers_from_persisted_store() {
    let store = Arc::new(InMemoryStore::new());
    let (indexes, _) = services(Arc::clone(&store));
    indexes.rebuild(&corpus()).await.unwrap();

    // A second service graph over the same store, as a new process
    // would see it.
    let (fresh_indexes, fresh_retriever) = services(store);
    fresh_indexes.restore().await.unwrap();

    let answer = fresh_retriever
        .answer("screening sanctions", RetrievalMode::Hybrid, None, Some(0.0))
        .await
        .unwrap();
    assert_eq!(answer.sources[0].url, "https://example.com/screening");
}

#[tokio::test]
async fn test_top_k_limits_result_count() {
    let (indexes, retriever) = services(Arc::new(InMemoryStore::new()));
    indexes.rebuild(&corpus()).await.unwrap();

    let answer = retriever
        .answer("customer transaction", RetrievalMode::Hybrid, Some(1), Some(0.0))
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 1);
}
