//! Hybrid score fusion.
//!
//! Combines dense and sparse result lists into one ranking: each
//! list's raw scores are min-max normalized into [0, 1], then every
//! chunk appearing in either list gets a weighted sum of its two
//! normalized scores (0.0 for a list it is absent from).

use std::collections::HashMap;

use crate::core::error::{Result, SiteragError};
use crate::core::types::{Chunk, FusedResult, ScoredResult};

/// Weights applied to the normalized dense and keyword scores.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub dense: f32,
    pub keyword: f32,
}

impl FusionWeights {
    /// Weights must be non-negative and sum to 1.0.
    pub fn new(dense: f32, keyword: f32) -> Result<Self> {
        if dense < 0.0 || keyword < 0.0 {
            return Err(SiteragError::Config(
                "Fusion weights must be non-negative".to_string(),
            ));
        }
        if (dense + keyword - 1.0).abs() > 1e-6 {
            return Err(SiteragError::Config(format!(
                "Fusion weights must sum to 1.0, got {dense} + {keyword}"
            )));
        }
        Ok(Self { dense, keyword })
    }
}

/// Min-max normalize raw scores into [0, 1].
///
/// A degenerate list where all scores are equal normalizes to 1.0
/// for every element rather than dividing by zero.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range <= f32::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

/// Fuse dense and sparse results into one combined ranking.
///
/// Ties on combined score break on the normalized dense score, then
/// on chunk id, so rankings are deterministic.
pub fn fuse(
    dense: &[ScoredResult],
    sparse: &[ScoredResult],
    weights: FusionWeights,
) -> Vec<FusedResult> {
    let dense_norm = min_max_normalize(&dense.iter().map(|r| r.raw_score).collect::<Vec<_>>());
    let sparse_norm = min_max_normalize(&sparse.iter().map(|r| r.raw_score).collect::<Vec<_>>());

    struct Entry {
        chunk: Chunk,
        dense: f32,
        sparse: f32,
    }

    let mut merged: HashMap<String, Entry> = HashMap::new();
    for (result, norm) in dense.iter().zip(dense_norm) {
        merged.insert(
            result.chunk.id.clone(),
            Entry {
                chunk: result.chunk.clone(),
                dense: norm,
                sparse: 0.0,
            },
        );
    }
    for (result, norm) in sparse.iter().zip(sparse_norm) {
        merged
            .entry(result.chunk.id.clone())
            .and_modify(|e| e.sparse = norm)
            .or_insert_with(|| Entry {
                chunk: result.chunk.clone(),
                dense: 0.0,
                sparse: norm,
            });
    }

    let mut fused: Vec<(Entry, f32)> = merged
        .into_values()
        .map(|e| {
            let combined = weights.dense * e.dense + weights.keyword * e.sparse;
            (e, combined)
        })
        .collect();

    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.0.dense
                    .partial_cmp(&a.0.dense)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.0.chunk.id.cmp(&b.0.chunk.id))
    });

    fused
        .into_iter()
        .map(|(e, combined)| FusedResult {
            chunk: e.chunk,
            combined_score: combined,
        })
        .collect()
}
