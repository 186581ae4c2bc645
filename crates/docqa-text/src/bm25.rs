use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use docqa_core::error::{Error, Result};

use crate::tokenize::whitespace_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
    /// Fraction of the mean idf assigned to terms whose raw idf is negative.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
    }
}

/// Okapi BM25 statistics for a fixed chunk sequence.
///
/// Row `i` of every per-chunk table belongs to chunk id `i`. The index is
/// read-only once fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<BTreeMap<String, u32>>,
    chunk_lens: Vec<usize>,
    avg_chunk_len: f64,
    idf: BTreeMap<String, f64>,
}

impl Bm25Index {
    pub fn fit<S: AsRef<str>>(chunks: &[S]) -> Result<Self> {
        Self::fit_with(Bm25Params::default(), chunks)
    }

    pub fn fit_with<S: AsRef<str>>(params: Bm25Params, chunks: &[S]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::validation("cannot build a lexical index over zero chunks"));
        }
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut chunk_lens = Vec::with_capacity(chunks.len());
        let mut chunk_counts: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in chunks {
            let tokens = whitespace_tokens(chunk.as_ref());
            chunk_lens.push(tokens.len());
            let mut freqs: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens {
                *freqs.entry(token.to_string()).or_default() += 1;
            }
            for term in freqs.keys() {
                *chunk_counts.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(freqs);
        }
        let total: usize = chunk_lens.iter().sum();
        if total == 0 {
            return Err(Error::validation("chunks contain no tokens"));
        }
        let avg_chunk_len = total as f64 / chunks.len() as f64;
        let idf = compute_idf(&params, chunks.len(), &chunk_counts);
        tracing::debug!(chunks = chunks.len(), terms = idf.len(), avg_chunk_len, "fit bm25 index");
        Ok(Self { params, term_freqs, chunk_lens, avg_chunk_len, idf })
    }

    pub fn len(&self) -> usize {
        self.chunk_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_lens.is_empty()
    }

    /// Token count of every chunk, by chunk id.
    pub fn chunk_lens(&self) -> &[usize] {
        &self.chunk_lens
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Idf of `term`, zero for terms outside the corpus.
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// One score per chunk. Repeated query terms contribute once per occurrence.
    pub fn scores(&self, query_terms: &[&str]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.len()];
        for term in query_terms {
            let idf = self.idf(term);
            if idf == 0.0 {
                continue;
            }
            for (i, freqs) in self.term_freqs.iter().enumerate() {
                let Some(&tf) = freqs.get(*term) else { continue };
                let tf = f64::from(tf);
                let len_norm = 1.0 - b + b * self.chunk_lens[i] as f64 / self.avg_chunk_len;
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * len_norm);
            }
        }
        scores
    }

    /// Whitespace-tokenize `query` and score every chunk.
    pub fn score_query(&self, query: &str) -> Vec<f64> {
        self.scores(&whitespace_tokens(query))
    }
}

/// `ln(N - n + 0.5) - ln(n + 0.5)`; negative values are replaced by
/// `epsilon * mean_idf`, floored at zero so scores stay non-negative.
fn compute_idf(
    params: &Bm25Params,
    n_chunks: usize,
    chunk_counts: &BTreeMap<String, usize>,
) -> BTreeMap<String, f64> {
    let n = n_chunks as f64;
    let mut idf = BTreeMap::new();
    let mut sum = 0.0;
    let mut negative = Vec::new();
    for (term, &count) in chunk_counts {
        let df = count as f64;
        let value = (n - df + 0.5).ln() - (df + 0.5).ln();
        sum += value;
        if value < 0.0 {
            negative.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }
    if !chunk_counts.is_empty() {
        let floor = (params.epsilon * sum / chunk_counts.len() as f64).max(0.0);
        for term in negative {
            idf.insert(term, floor);
        }
    }
    idf
}
