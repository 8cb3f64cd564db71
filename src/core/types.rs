//! Core data types for the siterag service.
//!
//! Defines the domain structures shared by the crawler, chunker,
//! both indexes and the retrieval orchestrator, plus the request
//! and response DTOs exposed to the HTTP and CLI adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single fetched page, identified by its normalized URL.
///
/// Pages are immutable once created and fully consumed by the
/// chunker; they are not retained after chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Normalized URL (scheme + host + path, no fragment/query)
    pub url: String,

    /// Page title from the `<title>` element (may be empty)
    pub title: String,

    /// Extracted body text with non-content elements removed
    pub text: String,

    /// Fetch timestamp
    pub fetched_at: DateTime<Utc>,
}

/// A bounded, overlap-linked span of one page's text.
///
/// The unit of indexing and retrieval, shared by the dense and
/// sparse indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier: `{source_url}#{sequence_index}`
    pub id: String,

    /// Normalized URL of the source page
    pub source_url: String,

    /// Title of the source page
    pub title: String,

    /// 0-based position within the page's chunk sequence
    pub sequence_index: usize,

    /// The chunk text
    pub text: String,

    /// Token count as measured by the chunking tokenizer
    pub token_count: usize,
}

impl Chunk {
    /// Build the stable chunk id from its source URL and position.
    pub fn make_id(source_url: &str, sequence_index: usize) -> String {
        format!("{source_url}#{sequence_index}")
    }
}

/// Retrieval strategy selected per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Dense vector similarity only
    Semantic,
    /// BM25 keyword ranking only
    Keyword,
    /// Both, fused with weighted normalized scores
    Hybrid,
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Semantic => write!(f, "semantic"),
            RetrievalMode::Keyword => write!(f, "keyword"),
            RetrievalMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(RetrievalMode::Semantic),
            "keyword" => Ok(RetrievalMode::Keyword),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(format!(
                "unknown mode '{other}' (expected semantic, keyword or hybrid)"
            )),
        }
    }
}

/// One retrieval hit with its raw and normalized scores.
///
/// Ephemeral, produced per query, never persisted.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub chunk: Chunk,
    pub raw_score: f32,
    pub normalized_score: f32,
    pub mode: RetrievalMode,
}

/// Output of the hybrid fuser: one chunk with its combined score.
#[derive(Debug, Clone)]
pub struct FusedResult {
    pub chunk: Chunk,
    pub combined_score: f32,
}

/// A source reference returned alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
    pub score: f32,
}

/// Final answer assembled by the retrieval orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The original question
    pub question: String,

    /// Synthesized answer text (empty when synthesis degraded)
    pub answer: String,

    /// Ranked source chunks that survived the score threshold
    pub sources: Vec<SourceRef>,

    /// Normalized score of the top result, 0.0 for no-answer
    pub confidence: f32,
}

impl Answer {
    /// Sentinel returned when no chunk clears the score threshold.
    ///
    /// The synthesis collaborator is never invoked for this case.
    pub fn no_answer(question: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: "I couldn't find relevant information to answer your question.".to_string(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }

    /// True when this is the no-answer sentinel.
    pub fn is_no_answer(&self) -> bool {
        self.sources.is_empty() && self.confidence == 0.0
    }
}

/// Statistics from a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages fetched successfully with non-empty content
    pub pages_fetched: usize,

    /// Distinct normalized URLs visited (fetched or attempted)
    pub urls_visited: usize,

    /// Crawl duration in milliseconds
    pub duration_ms: u64,
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Pages consumed by the build
    pub pages: usize,

    /// Chunks indexed into both indexes
    pub chunks_indexed: usize,

    /// Monotonic snapshot version both indexes were built against
    pub snapshot_version: u64,

    /// Build duration in milliseconds
    pub duration_ms: u64,
}

/// Request accepted by the query endpoint and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question
    pub question: String,

    /// Retrieval mode (defaults to hybrid)
    #[serde(default)]
    pub mode: Option<RetrievalMode>,

    /// Number of results to retrieve (defaults from config)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Minimum normalized score in [0, 1] (defaults from config)
    #[serde(default)]
    pub min_score: Option<f32>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Index statistics response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Current snapshot version, if any build has completed
    pub snapshot_version: Option<u64>,

    /// Chunks in the current snapshot
    pub chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(
            Chunk::make_id("https://example.com/about", 3),
            "https://example.com/about#3"
        );
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in [
            RetrievalMode::Semantic,
            RetrievalMode::Keyword,
            RetrievalMode::Hybrid,
        ] {
            let parsed: RetrievalMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn test_mode_parse_rejects_unknown() {
        assert!("vector".parse::<RetrievalMode>().is_err());
    }

    #[test]
    fn test_mode_serde_lowercase() {
        let json = serde_json::to_string(&RetrievalMode::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
        let parsed: RetrievalMode = serde_json::from_str("\"keyword\"").unwrap();
        assert_eq!(parsed, RetrievalMode::Keyword);
    }

    #[test]
    fn test_no_answer_sentinel() {
        let answer = Answer::no_answer("What is this?");
        assert!(answer.is_no_answer());
        assert_eq!(answer.confidence, 0.0);
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_query_request_defaults() {
        let json = r#"{"question": "what does it do?"}"#;
        let req: QueryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.question, "what does it do?");
        assert!(req.mode.is_none());
        assert!(req.top_k.is_none());
        assert!(req.min_score.is_none());
    }
}
