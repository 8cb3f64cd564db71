//! Hand-built BM25 keyword index.
//!
//! In-memory inverted index over chunk texts with Okapi BM25
//! scoring. Built once per snapshot and immutable afterwards, so
//! queries need no locking.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::core::types::Chunk;

/// Common English terms excluded from indexing and queries.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were",
        "will", "with",
    ]
    .into_iter()
    .collect()
});

/// Lowercase and split on non-alphanumeric characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Immutable BM25 index over a set of chunks.
pub struct SparseIndex {
    /// term -> chunk id -> term frequency
    postings: HashMap<String, HashMap<String, usize>>,

    /// chunk id -> token count
    doc_len: HashMap<String, usize>,

    avgdl: f32,
    n_docs: usize,
    k1: f32,
    b: f32,
}

impl SparseIndex {
    /// Build the index from chunks with the given BM25 parameters.
    pub fn build(chunks: &[Chunk], k1: f32, b: f32) -> Self {
        let mut postings: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut doc_len = HashMap::new();
        let mut total_len = 0usize;

        for chunk in chunks {
            let tokens = tokenize(&chunk.text);
            total_len += tokens.len();
            doc_len.insert(chunk.id.clone(), tokens.len());
            for token in tokens {
                *postings
                    .entry(token)
                    .or_default()
                    .entry(chunk.id.clone())
                    .or_insert(0) += 1;
            }
        }

        let n_docs = chunks.len();
        let avgdl = if n_docs == 0 {
            0.0
        } else {
            total_len as f32 / n_docs as f32
        };

        Self {
            postings,
            doc_len,
            avgdl,
            n_docs,
            k1,
            b,
        }
    }

    pub fn len(&self) -> usize {
        self.n_docs
    }

    pub fn is_empty(&self) -> bool {
        self.n_docs == 0
    }

    /// BM25 scores for `query`, best first.
    ///
    /// Chunks scoring exactly zero are excluded, so a query sharing
    /// no terms with the corpus yields an empty result. Ties break
    /// on chunk id for determinism.
    pub fn query(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        if self.n_docs == 0 {
            return Vec::new();
        }

        let mut scores: HashMap<&str, f32> = HashMap::new();
        for term in tokenize(query) {
            let Some(docs) = self.postings.get(&term) else {
                continue;
            };

            let n = docs.len() as f32;
            let idf = (((self.n_docs as f32 - n + 0.5) / (n + 0.5)) + 1.0).ln();

            for (doc_id, &tf) in docs {
                let tf = tf as f32;
                let len_norm =
                    1.0 - self.b + self.b * (self.doc_len[doc_id] as f32 / self.avgdl);
                let score = idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * len_norm);
                *scores.entry(doc_id.as_str()).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(String, f32)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(id, score)| (id.to_string(), score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_url: "https://example.com/".to_string(),
            title: String::new(),
            sequence_index: 0,
            text: text.to_string(),
            token_count: text.split_whitespace().count(),
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("a#0", "AML screening and transaction monitoring for banks"),
            chunk("b#0", "Customer onboarding with document verification"),
            chunk("c#0", "AML compliance reports and AML risk scoring"),
            chunk("d#0", "Pricing plans for enterprise teams"),
        ]
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("AML-screening, done right!"),
            vec!["aml", "screening", "done", "right"]
        );
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(tokenize("the risk of the bank"), vec!["risk", "bank"]);
    }

    #[test]
    fn test_query_matches_only_term_overlap() {
        let index = SparseIndex::build(&corpus(), 1.5, 0.75);
        let hits = index.query("AML screening", 10);
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"a#0"));
        assert!(ids.contains(&"c#0"));
        assert!(!ids.contains(&"b#0"));
        assert!(!ids.contains(&"d#0"));
    }

    #[test]
    fn test_zero_overlap_yields_empty() {
        let index = SparseIndex::build(&corpus(), 1.5, 0.75);
        assert!(index.query("quantum chromodynamics", 10).is_empty());
    }

    #[test]
    fn test_higher_tf_scores_higher() {
        let chunks = vec![
            chunk("once#0", "fraud detection for payments"),
            chunk("twice#0", "fraud models catch fraud patterns"),
        ];
        let index = SparseIndex::build(&chunks, 1.5, 0.75);
        let hits = index.query("fraud", 10);
        assert_eq!(hits[0].0, "twice#0");
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn test_scores_are_positive_and_deterministic() {
        let index = SparseIndex::build(&corpus(), 1.5, 0.75);
        let a = index.query("AML risk", 10);
        let b = index.query("AML risk", 10);
        assert_eq!(a, b);
        for (_, score) in &a {
            assert!(*score > 0.0);
        }
    }

    #[test]
    fn test_empty_index() {
        let index = SparseIndex::build(&[], 1.5, 0.75);
        assert!(index.is_empty());
        assert!(index.query("anything", 5).is_empty());
    }

    #[test]
    fn test_top_k_truncation() {
        let index = SparseIndex::build(&corpus(), 1.5, 0.75);
        let hits = index.query("AML", 1);
        assert_eq!(hits.len(), 1);
        // c#0 has "AML" twice
        assert_eq!(hits[0].0, "c#0");
    }
}
