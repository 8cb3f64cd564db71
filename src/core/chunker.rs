//! Sentence-aware text chunking.
//!
//! Splits page text into chunks bounded by a token budget, breaking
//! at sentence boundaries where possible and carrying a fixed-size
//! overlap of trailing sentences between adjacent chunks so context
//! at the seams is not lost.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{Result, SiteragError};
use crate::core::types::{Chunk, Page};

/// Sentence boundary: one or more terminators followed by whitespace.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("sentence boundary regex"));

/// Token counting and splitting used to measure chunk budgets.
///
/// Kept behind a trait so a model-specific tokenizer can replace
/// whitespace counting without touching the chunking logic.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize;

    /// Split `text` into its tokens.
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Whitespace-delimited tokenization.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }
}

/// Sentence-respecting chunker with token-budget overlap.
pub struct Chunker<T: Tokenizer = WhitespaceTokenizer> {
    chunk_size: usize,
    overlap: usize,
    tokenizer: T,
}

impl Chunker<WhitespaceTokenizer> {
    /// Chunker with whitespace tokenization.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::with_tokenizer(chunk_size, overlap, WhitespaceTokenizer)
    }
}

impl<T: Tokenizer> Chunker<T> {
    /// Chunker with a custom tokenizer.
    ///
    /// Fails when `overlap >= chunk_size`, which would make chunking
    /// non-terminating.
    pub fn with_tokenizer(chunk_size: usize, overlap: usize, tokenizer: T) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SiteragError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(SiteragError::Config(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
            tokenizer,
        })
    }

    /// Chunk one page's text.
    ///
    /// Empty or whitespace-only pages yield no chunks. Sequence
    /// indexes are 0-based and contiguous per page.
    pub fn chunk_page(&self, page: &Page) -> Vec<Chunk> {
        let sentences = split_sentences(&page.text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut pieces: Vec<String> = Vec::new();
        // Sentences of the chunk under construction, with counts.
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_tokens = 0usize;

        for sentence in sentences {
            let tokens = self.tokenizer.count(&sentence);

            if tokens > self.chunk_size {
                // A single sentence over budget: flush, then hard-split
                // it at token boundaries.
                if !current.is_empty() {
                    pieces.push(join_sentences(&current));
                    current.clear();
                    current_tokens = 0;
                }
                pieces.extend(self.hard_split(&sentence));
                continue;
            }

            if current_tokens + tokens > self.chunk_size && !current.is_empty() {
                pieces.push(join_sentences(&current));

                // Seed the next chunk with trailing sentences up to
                // the overlap budget.
                let mut kept: Vec<(String, usize)> = Vec::new();
                let mut kept_tokens = 0usize;
                for (text, count) in current.iter().rev() {
                    if kept_tokens + count > self.overlap {
                        break;
                    }
                    kept_tokens += count;
                    kept.push((text.clone(), *count));
                }
                kept.reverse();
                current = kept;
                current_tokens = kept_tokens;
            }

            current_tokens += tokens;
            current.push((sentence, tokens));
        }

        if !current.is_empty() {
            pieces.push(join_sentences(&current));
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let token_count = self.tokenizer.count(&text);
                Chunk {
                    id: Chunk::make_id(&page.url, i),
                    source_url: page.url.clone(),
                    title: page.title.clone(),
                    sequence_index: i,
                    text,
                    token_count,
                }
            })
            .collect()
    }

    /// Split an over-budget sentence at token boundaries with the
    /// configured overlap between windows.
    fn hard_split(&self, sentence: &str) -> Vec<String> {
        let tokens = self.tokenizer.split(sentence);
        let step = self.chunk_size - self.overlap;
        let mut out = Vec::new();
        let mut start = 0usize;
        while start < tokens.len() {
            let end = (start + self.chunk_size).min(tokens.len());
            out.push(tokens[start..end].join(" "));
            if end == tokens.len() {
                break;
            }
            start += step;
        }
        out
    }
}

/// Split text into sentences, keeping terminators attached.
fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut last = 0usize;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // Keep the terminator, drop the trailing whitespace.
        let terminator_end = boundary.start()
            + text[boundary.start()..boundary.end()]
                .find(char::is_whitespace)
                .unwrap_or(boundary.end() - boundary.start());
        let sentence = text[last..terminator_end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = boundary.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

fn join_sentences(sentences: &[(String, usize)]) -> String {
    sentences
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn page(text: &str) -> Page {
        Page {
            url: "https://example.com/doc".to_string(),
            title: "Doc".to_string(),
            text: text.to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_chunk_size() {
        assert!(Chunker::new(100, 100).is_err());
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 50).is_ok());
    }

    #[test]
    fn test_empty_page_yields_no_chunks() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert!(chunker.chunk_page(&page("")).is_empty());
        assert!(chunker.chunk_page(&page("   \n  ")).is_empty());
    }

    #[test]
    fn test_short_page_yields_one_chunk() {
        let chunker = Chunker::new(100, 10).unwrap();
        let chunks = chunker.chunk_page(&page("One sentence. And another one."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "https://example.com/doc#0");
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].text, "One sentence. And another one.");
    }

    #[test]
    fn test_sentence_splitting_keeps_terminators() {
        let sentences = split_sentences("First one. Second one! Third one? Tail without end");
        assert_eq!(
            sentences,
            vec![
                "First one.".to_string(),
                "Second one!".to_string(),
                "Third one?".to_string(),
                "Tail without end".to_string(),
            ]
        );
    }

    #[test]
    fn test_chunks_respect_budget_and_overlap() {
        // 120 sentences of 10 tokens each = 1200 tokens.
        let sentence = "alpha bravo charlie delta echo foxtrot golf hotel india juliet.";
        let text = vec![sentence; 120].join(" ");
        let chunker = Chunker::new(500, 50).unwrap();

        let chunks = chunker.chunk_page(&page(&text));
        assert_eq!(chunks.len(), 3);

        for chunk in &chunks {
            assert!(chunk.token_count <= 500, "chunk over budget: {}", chunk.token_count);
        }

        // Adjacent chunks share the trailing 5 sentences (50 tokens).
        for pair in chunks.windows(2) {
            let prev_tail: Vec<&str> = pair[0].text.split_whitespace().rev().take(50).collect();
            let next_head: Vec<&str> = pair[1].text.split_whitespace().take(50).collect();
            let prev_tail: Vec<&str> = prev_tail.into_iter().rev().collect();
            assert_eq!(prev_tail, next_head);
        }

        // Sequence indexes are contiguous.
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
        }
    }

    #[test]
    fn test_oversized_sentence_hard_split() {
        // One 250-token "sentence" with no boundaries.
        let words: Vec<String> = (0..250).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let chunker = Chunker::new(100, 20).unwrap();

        let chunks = chunker.chunk_page(&page(&text));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 100);
        }
        // Windows step by chunk_size - overlap = 80 tokens.
        assert!(chunks[1].text.starts_with("w80 "));
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let sentence = "the quick brown fox jumps over the lazy dog again.";
        let text = vec![sentence; 40].join(" ");
        let chunker = Chunker::new(120, 30).unwrap();

        let a = chunker.chunk_page(&page(&text));
        let b = chunker.chunk_page(&page(&text));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
        }
    }
}
