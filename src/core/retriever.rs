//! Retrieval orchestrator.
//!
//! Answers a question against the current index snapshot: dispatches
//! to the dense index, the sparse index or both (fused), applies the
//! score threshold, and assembles the final answer with its sources.
//!
//! Synthesis failures degrade rather than fail the query: the
//! sources and confidence still come back, with an empty answer
//! text. The no-answer sentinel is the one case where synthesis is
//! never attempted.

use std::sync::Arc;

use crate::core::config::RetrievalConfig;
use crate::core::error::{Result, SiteragError};
use crate::core::fusion::{fuse, min_max_normalize, FusionWeights};
use crate::core::index::{IndexSet, IndexSnapshot};
use crate::core::synthesis::AnswerSynthesizer;
use crate::core::types::{Answer, Chunk, RetrievalMode, ScoredResult, SourceRef};

pub struct Retriever {
    indexes: Arc<IndexSet>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    config: RetrievalConfig,
    weights: FusionWeights,
}

impl Retriever {
    pub fn new(
        indexes: Arc<IndexSet>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let weights = FusionWeights::new(config.dense_weight, config.keyword_weight)?;
        Ok(Self {
            indexes,
            synthesizer,
            config,
            weights,
        })
    }

    /// Answer `question` with the given mode and overrides.
    ///
    /// `top_k` and `min_score` fall back to the configured defaults;
    /// `top_k` is clamped to the configured maximum.
    pub async fn answer(
        &self,
        question: &str,
        mode: RetrievalMode,
        top_k: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SiteragError::InvalidQuery(
                "Question must not be empty".to_string(),
            ));
        }

        let min_score = min_score.unwrap_or(self.config.min_score);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(SiteragError::InvalidQuery(format!(
                "min_score must be in [0, 1], got {min_score}"
            )));
        }

        let top_k = top_k
            .unwrap_or(self.config.default_top_k)
            .clamp(1, self.config.max_top_k);

        let snapshot = self.indexes.snapshot()?;

        tracing::debug!("Query ({mode}, top_k {top_k}): {question}");

        let mut results = match mode {
            RetrievalMode::Semantic => self.semantic(&snapshot, question, top_k).await?,
            RetrievalMode::Keyword => self.keyword(&snapshot, question, top_k),
            RetrievalMode::Hybrid => self.hybrid(&snapshot, question, top_k).await?,
        };

        results.retain(|r| r.normalized_score >= min_score);
        results.truncate(top_k);

        if results.is_empty() {
            tracing::debug!("No results above threshold {min_score}");
            return Ok(Answer::no_answer(question));
        }

        let confidence = results[0].normalized_score;
        let sources: Vec<SourceRef> = results
            .iter()
            .map(|r| SourceRef {
                url: r.chunk.source_url.clone(),
                title: r.chunk.title.clone(),
                score: r.normalized_score,
            })
            .collect();

        let context = build_context(&results);
        let answer = match self.synthesizer.synthesize(question, &context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Answer synthesis failed, returning sources only: {e}");
                String::new()
            }
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
            confidence,
        })
    }

    /// Dense-only retrieval. Cosine scores are already comparable,
    /// so normalization just clamps into [0, 1].
    async fn semantic(
        &self,
        snapshot: &IndexSnapshot,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let hits = snapshot.dense.query(question, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|(chunk, score)| ScoredResult {
                chunk,
                raw_score: score,
                normalized_score: score.clamp(0.0, 1.0),
                mode: RetrievalMode::Semantic,
            })
            .collect())
    }

    /// Sparse-only retrieval with min-max normalized BM25 scores.
    fn keyword(
        &self,
        snapshot: &IndexSnapshot,
        question: &str,
        top_k: usize,
    ) -> Vec<ScoredResult> {
        let hits = snapshot.sparse.query(question, top_k);
        let raw: Vec<f32> = hits.iter().map(|(_, s)| *s).collect();
        let normalized = min_max_normalize(&raw);

        hits.into_iter()
            .zip(normalized)
            .filter_map(|((id, raw_score), normalized_score)| {
                snapshot.chunk(&id).map(|chunk| ScoredResult {
                    chunk: chunk.clone(),
                    raw_score,
                    normalized_score,
                    mode: RetrievalMode::Keyword,
                })
            })
            .collect()
    }

    /// Hybrid retrieval: both indexes are queried wider than top_k
    /// so fusion has candidates unique to either side, then fused
    /// scores rank the final list.
    async fn hybrid(
        &self,
        snapshot: &IndexSnapshot,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let fetch = top_k.saturating_mul(2);
        let dense = self.semantic(snapshot, question, fetch).await?;
        let sparse = self.keyword(snapshot, question, fetch);

        Ok(fuse(&dense, &sparse, self.weights)
            .into_iter()
            .map(|fused| ScoredResult {
                raw_score: fused.combined_score,
                normalized_score: fused.combined_score,
                chunk: fused.chunk,
                mode: RetrievalMode::Hybrid,
            })
            .collect())
    }
}

/// Format retrieved chunks into the synthesis context block.
fn build_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format_source(i + 1, &r.chunk))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_source(number: usize, chunk: &Chunk) -> String {
    format!(
        "[Source {number} - {}]\n{}\nURL: {}",
        chunk.title, chunk.text, chunk.source_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::embedding::EmbeddingClient;
    use crate::core::types::Page;
    use crate::core::vector_store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder projecting text onto two keyword axes.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingClient for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    vec![
                        if lower.contains("screening") { 1.0 } else { 0.0 },
                        if lower.contains("pricing") { 1.0 } else { 0.0 },
                        0.1,
                    ]
                })
                .collect())
        }
    }

    struct RecordingSynthesizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnswerSynthesizer for RecordingSynthesizer {
        async fn synthesize(&self, _question: &str, context: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("synthesized from {} chars", context.len()))
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl AnswerSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _question: &str, _context: &str) -> Result<String> {
            Err(SiteragError::EmbeddingUnavailable("llm down".to_string()))
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

    async fn built_indexes() -> Arc<IndexSet> {
        let set = Arc::new(IndexSet::new(
            Arc::new(KeywordEmbedder),
            Arc::new(InMemoryStore::new()),
            Config::default(),
        ));
        set.rebuild(&[
            page(
                "https://example.com/screening",
                "Screening",
                "Screening checks every transaction in real time.",
            ),
            page(
                "https://example.com/pricing",
                "Pricing",
                "Pricing starts at ten dollars per seat.",
            ),
        ])
        .await
        .unwrap();
        set
    }

    fn retriever(
        indexes: Arc<IndexSet>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Retriever {
        Retriever::new(indexes, synthesizer, RetrievalConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_empty_question() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let result = r.answer("   ", RetrievalMode::Hybrid, None, None).await;
        assert!(matches!(result, Err(SiteragError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_query_before_build_is_index_not_built() {
        let empty = Arc::new(IndexSet::new(
            Arc::new(KeywordEmbedder),
            Arc::new(InMemoryStore::new()),
            Config::default(),
        ));
        let r = retriever(
            empty,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let result = r
            .answer("anything", RetrievalMode::Semantic, None, None)
            .await;
        assert!(matches!(result, Err(SiteragError::IndexNotBuilt)));
    }

    #[tokio::test]
    async fn test_semantic_mode_ranks_by_similarity() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let answer = r
            .answer("screening rules", RetrievalMode::Semantic, Some(1), Some(0.0))
            .await
            .unwrap();
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].url, "https://example.com/screening");
        assert!(answer.confidence > 0.5);
    }

    #[tokio::test]
    async fn test_keyword_mode_uses_bm25() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let answer = r
            .answer("pricing dollars", RetrievalMode::Keyword, None, Some(0.0))
            .await
            .unwrap();
        assert_eq!(answer.sources[0].url, "https://example.com/pricing");
    }

    #[tokio::test]
    async fn test_hybrid_mode_fuses_both() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let answer = r
            .answer(
                "screening transaction",
                RetrievalMode::Hybrid,
                None,
                Some(0.0),
            )
            .await
            .unwrap();
        assert!(!answer.sources.is_empty());
        assert_eq!(answer.sources[0].url, "https://example.com/screening");
        assert!(answer.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_no_results_returns_sentinel_without_synthesis() {
        let synthesizer = Arc::new(RecordingSynthesizer {
            calls: AtomicUsize::new(0),
        });
        let r = retriever(built_indexes().await, Arc::clone(&synthesizer) as _);

        // Keyword mode with no term overlap yields nothing.
        let answer = r
            .answer("quantum chromodynamics", RetrievalMode::Keyword, None, None)
            .await
            .unwrap();
        assert!(answer.is_no_answer());
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_threshold_yields_sentinel_without_synthesis() {
        let synthesizer = Arc::new(RecordingSynthesizer {
            calls: AtomicUsize::new(0),
        });
        let r = retriever(built_indexes().await, Arc::clone(&synthesizer) as _);

        // Low-similarity question with a threshold nothing clears.
        let answer = r
            .answer(
                "unrelated words entirely",
                RetrievalMode::Semantic,
                None,
                Some(0.9),
            )
            .await
            .unwrap();
        assert!(answer.is_no_answer());
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_degrades_to_sources_only() {
        let r = retriever(built_indexes().await, Arc::new(FailingSynthesizer));
        let answer = r
            .answer("screening", RetrievalMode::Semantic, None, Some(0.0))
            .await
            .unwrap();
        assert!(answer.answer.is_empty());
        assert!(!answer.sources.is_empty());
        assert!(answer.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_min_score_filters_results() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let all = r
            .answer("screening", RetrievalMode::Semantic, Some(5), Some(0.0))
            .await
            .unwrap();
        let strict = r
            .answer("screening", RetrievalMode::Semantic, Some(5), Some(0.9))
            .await
            .unwrap();
        assert!(strict.sources.len() <= all.sources.len());
    }

    #[tokio::test]
    async fn test_top_k_clamped_to_max() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        // max_top_k defaults to 50; requesting more must not error.
        let answer = r
            .answer("screening", RetrievalMode::Semantic, Some(10_000), Some(0.0))
            .await
            .unwrap();
        assert!(answer.sources.len() <= 50);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_min_score() {
        let r = retriever(
            built_indexes().await,
            Arc::new(RecordingSynthesizer {
                calls: AtomicUsize::new(0),
            }),
        );
        let result = r
            .answer("screening", RetrievalMode::Semantic, None, Some(1.5))
            .await;
        assert!(matches!(result, Err(SiteragError::InvalidQuery(_))));
    }

    #[test]
    fn test_context_format() {
        let chunk = Chunk {
            id: "https://example.com/a#0".to_string(),
            source_url: "https://example.com/a".to_string(),
            title: "About".to_string(),
            sequence_index: 0,
            text: "We do compliance.".to_string(),
            token_count: 3,
        };
        let formatted = format_source(1, &chunk);
        assert_eq!(
            formatted,
            "[Source 1 - About]\nWe do compliance.\nURL: https://example.com/a"
        );
    }
}
