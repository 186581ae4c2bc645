//! Score normalization, fusion and top-k selection over dense score vectors.
//!
//! A score vector holds one relevance value per chunk, aligned by
//! [`ChunkId`](crate::types::ChunkId).

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::ChunkId;

/// Weight applied to each of the two normalized signals during fusion.
pub const FUSION_WEIGHT: f64 = 0.5;

/// Divide every score by the vector's maximum.
///
/// A vector whose maximum is not strictly positive carries no relevance
/// signal and normalizes to all zeros of the same length.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() || max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| s / max).collect()
}

/// `FUSION_WEIGHT * normalize(lexical) + FUSION_WEIGHT * normalize(vector)`.
pub fn fuse(lexical: &[f64], vector: &[f64]) -> Result<Vec<f64>> {
    if lexical.len() != vector.len() {
        return Err(Error::Operation(format!(
            "score vectors misaligned: lexical has {} entries, vector has {}",
            lexical.len(),
            vector.len()
        )));
    }
    let lexical = normalize(lexical);
    let vector = normalize(vector);
    Ok(lexical
        .iter()
        .zip(&vector)
        .map(|(l, v)| FUSION_WEIGHT * l + FUSION_WEIGHT * v)
        .collect())
}

/// Descending by score; equal scores put the higher chunk id first.
pub fn rank_order(scores: &[f64], a: ChunkId, b: ChunkId) -> Ordering {
    scores[b].total_cmp(&scores[a]).then_with(|| b.cmp(&a))
}

/// Indices of the `k` largest scores, best first. Returns all indices when
/// `k >= scores.len()`.
pub fn top_k(scores: &[f64], k: usize) -> Vec<ChunkId> {
    let mut ids: Vec<ChunkId> = (0..scores.len()).collect();
    ids.sort_by(|&a, &b| rank_order(scores, a, b));
    ids.truncate(k);
    ids
}
