use serde::Serialize;

use docqa_core::error::{Error, Result};
use docqa_core::scoring::{fuse, normalize, top_k};
use docqa_core::types::Candidate;

use crate::store::ArtifactSet;

/// Per-chunk scores behind a retrieval, aligned by chunk id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub lexical: Vec<f64>,
    pub vector: Vec<f64>,
    pub lexical_normalized: Vec<f64>,
    pub vector_normalized: Vec<f64>,
    pub fused: Vec<f64>,
}

/// Fuses BM25 and TF-IDF cosine scores into one candidate ranking.
#[derive(Debug, Default, Clone, Copy)]
pub struct HybridRetriever;

impl HybridRetriever {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, artifacts: &ArtifactSet, query: &str) -> Result<ScoreBreakdown> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        let lexical = artifacts.lexical.score_query(query);
        let vector = artifacts.vector.scores(query);
        let fused = fuse(&lexical, &vector)?;
        Ok(ScoreBreakdown {
            lexical_normalized: normalize(&lexical),
            vector_normalized: normalize(&vector),
            lexical,
            vector,
            fused,
        })
    }

    /// The `k` best chunks by fused score, best first; all chunks when the
    /// corpus holds fewer than `k`.
    pub fn retrieve(&self, artifacts: &ArtifactSet, query: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Err(Error::validation("k must be at least 1"));
        }
        let breakdown = self.score(artifacts, query)?;
        let candidates: Vec<Candidate> = top_k(&breakdown.fused, k)
            .into_iter()
            .map(|id| Candidate { id, text: artifacts.chunks[id].clone(), score: breakdown.fused[id] })
            .collect();
        tracing::debug!(
            k,
            returned = candidates.len(),
            ids = ?candidates.iter().map(|c| c.id).collect::<Vec<_>>(),
            "hybrid retrieval"
        );
        Ok(candidates)
    }
}
