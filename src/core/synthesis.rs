//! Answer synthesis from retrieved context.
//!
//! The default synthesizer is extractive: it pulls the sentences
//! from the retrieved chunks that share the most terms with the
//! question. The trait is async so a generative backend can slot in
//! without touching the retriever.

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::index::sparse::tokenize;

/// Produces an answer string from a question and retrieved context.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String>;
}

/// Extractive synthesizer: top question-overlapping sentences from
/// the context, in their original order.
pub struct ExtractiveSynthesizer {
    max_sentences: usize,
}

impl ExtractiveSynthesizer {
    pub fn new() -> Self {
        Self { max_sentences: 3 }
    }
}

impl Default for ExtractiveSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerSynthesizer for ExtractiveSynthesizer {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String> {
        let keywords: Vec<String> = tokenize(question);
        if keywords.is_empty() {
            return Ok(String::new());
        }

        let sentences = split_sentences(context);
        let mut scored: Vec<(usize, usize, &str)> = sentences
            .iter()
            .enumerate()
            .filter_map(|(pos, sentence)| {
                let terms = tokenize(sentence);
                let overlap = keywords.iter().filter(|k| terms.contains(k)).count();
                (overlap > 0).then_some((overlap, pos, sentence.as_str()))
            })
            .collect();

        // Best overlap first, then earliest position.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(self.max_sentences);
        // Present picked sentences in document order.
        scored.sort_by_key(|(_, pos, _)| *pos);

        Ok(scored
            .into_iter()
            .map(|(_, _, sentence)| sentence)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_picks_overlapping_sentences() {
        let synthesizer = ExtractiveSynthesizer::new();
        let context = "AML screening runs in real time. \
                       Our pricing starts at ten dollars. \
                       Screening covers sanctions lists.";
        let answer = synthesizer
            .synthesize("how does screening work", context)
            .await
            .unwrap();
        assert!(answer.contains("AML screening runs in real time."));
        assert!(answer.contains("Screening covers sanctions lists."));
        assert!(!answer.contains("pricing"));
    }

    #[tokio::test]
    async fn test_caps_at_three_sentences() {
        let synthesizer = ExtractiveSynthesizer::new();
        let context = "Alpha risk one. Beta risk two. Gamma risk three. Delta risk four.";
        let answer = synthesizer.synthesize("risk", context).await.unwrap();
        let count = answer.matches('.').count();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_sentences_keep_document_order() {
        let synthesizer = ExtractiveSynthesizer::new();
        let context = "Onboarding is fast. Unrelated filler text here. Onboarding needs documents.";
        let answer = synthesizer.synthesize("onboarding", context).await.unwrap();
        assert_eq!(answer, "Onboarding is fast. Onboarding needs documents.");
    }

    #[tokio::test]
    async fn test_no_overlap_yields_empty() {
        let synthesizer = ExtractiveSynthesizer::new();
        let answer = synthesizer
            .synthesize("quantum physics", "We sell compliance software.")
            .await
            .unwrap();
        assert!(answer.is_empty());
    }
}
