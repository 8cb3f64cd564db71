//! Embedding client for dense vector generation.
//!
//! Talks to an OpenAI-compatible `/embeddings` endpoint. Transient
//! failures (429, 5xx, timeouts) are retried with exponential
//! backoff; anything else surfaces as `EmbeddingUnavailable` so the
//! caller can degrade instead of aborting the whole pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::config::EmbeddingConfig;
use crate::core::error::{Result, SiteragError};

/// Produces dense vectors for texts.
///
/// All texts in one call are embedded with the same model; the
/// returned vectors are positionally aligned with the input.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for OpenAI-compatible embedding endpoints.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    dimensions: Option<usize>,
    max_retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            SiteragError::Config(
                "No embedding API key configured (set OPENAI_API_KEY)".to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()
            .map_err(|e| SiteragError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        loop {
            let outcome = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match outcome {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
                            SiteragError::EmbeddingUnavailable(format!(
                                "Malformed embedding response: {e}"
                            ))
                        })?;
                        return align_vectors(parsed, texts.len());
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!("Embedding request got {status}, retry {attempt}");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }

                    let detail = resp.text().await.unwrap_or_default();
                    return Err(SiteragError::EmbeddingUnavailable(format!(
                        "Embedding API returned {status}: {detail}"
                    )));
                }
                Err(err) => {
                    if err.is_timeout() && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!("Embedding request timed out, retry {attempt}");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(SiteragError::EmbeddingUnavailable(format!(
                        "Embedding request failed: {err}"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

/// Order response vectors by their index field.
///
/// The API documents positional order but indexes are authoritative.
fn align_vectors(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(SiteragError::EmbeddingUnavailable(format!(
            "Embedding count mismatch: sent {expected} texts, got {} vectors",
            response.data.len()
        )));
    }
    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
