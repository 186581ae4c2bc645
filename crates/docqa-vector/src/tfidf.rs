use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use docqa_core::error::{Error, Result};

use crate::analyzer::analyze;

/// Sparse row with strictly increasing column indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Build from `(column, value)` pairs in any order; zero values are dropped.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|(i, _)| *i);
        let (indices, values) = pairs.into_iter().filter(|(_, v)| *v != 0.0).unzip();
        Self { indices, values }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Cosine similarity; zero when either side has no weight.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        self.dot(other) / denom
    }

    fn l2_normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
        self
    }
}

/// TF-IDF weights learned from a chunk sequence.
///
/// There is no way to refit or mutate a fitted vectorizer: it is created by
/// [`FittedVectorizer::fit`] or by deserializing a persisted one, and shared
/// behind an `Arc` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl FittedVectorizer {
    /// Learn the vocabulary and smoothed idf, returning the vectorizer along
    /// with the transformed rows of `docs`.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Result<(Self, Vec<SparseVector>)> {
        let analyzed: Vec<Vec<String>> = docs.iter().map(|d| analyze(d.as_ref())).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &analyzed {
            let mut seen: Vec<&str> = terms.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for t in seen {
                *doc_freq.entry(t).or_default() += 1;
            }
        }
        if doc_freq.is_empty() {
            return Err(Error::validation(
                "empty vocabulary; chunks contain only stop words or single characters",
            ));
        }

        let n = docs.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (col, (term, df)) in doc_freq.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), col);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        let fitted = Self { vocabulary, idf };
        let rows = analyzed.iter().map(|terms| fitted.weigh(terms)).collect();
        tracing::debug!(docs = docs.len(), features = fitted.n_features(), "fit tfidf vectorizer");
        Ok((fitted, rows))
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&col| self.idf[col])
    }

    /// Weighted, L2-normalized row for `text`. Terms outside the fitted
    /// vocabulary are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&analyze(text))
    }

    fn weigh(&self, terms: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in terms {
            if let Some(&col) = self.vocabulary.get(term) {
                *counts.entry(col).or_default() += 1.0;
            }
        }
        SparseVector::from_pairs(counts.into_iter().map(|(col, tf)| (col, tf * self.idf[col])).collect())
            .l2_normalized()
    }

    fn check(&self) -> Result<()> {
        let consistent = self.vocabulary.len() == self.idf.len()
            && self.vocabulary.values().all(|&col| col < self.idf.len());
        if consistent {
            Ok(())
        } else {
            Err(Error::Operation("vectorizer vocabulary and idf table disagree".into()))
        }
    }
}

/// One row per chunk, columns fixed by the vectorizer's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix {
    n_features: usize,
    rows: Vec<SparseVector>,
}

impl DocumentTermMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, id: usize) -> Option<&SparseVector> {
        self.rows.get(id)
    }

    pub fn cosine_scores(&self, query: &SparseVector) -> Vec<f64> {
        self.rows.iter().map(|row| row.cosine(query)).collect()
    }
}

/// Fitted vectorizer plus the matrix it produced for the chunk sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    vectorizer: Arc<FittedVectorizer>,
    matrix: DocumentTermMatrix,
}

impl VectorIndex {
    pub fn build<S: AsRef<str>>(chunks: &[S]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::validation("cannot build a vector index over zero chunks"));
        }
        let (vectorizer, rows) = FittedVectorizer::fit(chunks)?;
        let matrix = DocumentTermMatrix { n_features: vectorizer.n_features(), rows };
        Ok(Self { vectorizer: Arc::new(vectorizer), matrix })
    }

    pub fn vectorizer(&self) -> &Arc<FittedVectorizer> {
        &self.vectorizer
    }

    pub fn matrix(&self) -> &DocumentTermMatrix {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.n_rows() == 0
    }

    /// Cosine similarity of `query` against every chunk, aligned by chunk id.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        self.matrix.cosine_scores(&self.vectorizer.transform(query))
    }

    /// Structural checks for an index read back from storage.
    pub fn check(&self) -> Result<()> {
        self.vectorizer.check()?;
        let width = self.vectorizer.n_features();
        let in_bounds = self.matrix.n_features == width
            && self.matrix.rows.iter().all(|r| {
                r.indices.len() == r.values.len() && r.indices.iter().all(|&c| c < width)
            });
        if in_bounds {
            Ok(())
        } else {
            Err(Error::Operation("document-term matrix does not match the vectorizer".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_idf_matches_reference_values() {
        let (v, _) = FittedVectorizer::fit(&["cat sat", "cat ran", "dog"]).expect("fit");
        let cat = (4.0f64 / 3.0).ln() + 1.0;
        let dog = (4.0f64 / 2.0).ln() + 1.0;
        assert!((v.idf("cat").expect("cat") - cat).abs() < 1e-12);
        assert!((v.idf("dog").expect("dog") - dog).abs() < 1e-12);
        assert_eq!(v.idf("bird"), None);
    }

    #[test]
    fn vocabulary_is_sorted() {
        let (v, _) = FittedVectorizer::fit(&["zebra apple mango"]).expect("fit");
        let cols: Vec<(&str, usize)> = v.vocabulary().iter().map(|(k, c)| (k.as_str(), *c)).collect();
        assert_eq!(cols, vec![("apple", 0), ("mango", 1), ("zebra", 2)]);
    }

    #[test]
    fn rows_are_unit_length() {
        let (_, rows) = FittedVectorizer::fit(&["cat cat dog", "bird"]).expect("fit");
        for row in rows {
            assert!((row.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        assert!(matches!(FittedVectorizer::fit(&["the a of", "I"]), Err(Error::Validation(_))));
    }

    #[test]
    fn zero_vector_cosine_is_zero() {
        let a = SparseVector::from_pairs(vec![(0, 1.0)]);
        assert_eq!(a.cosine(&SparseVector::default()), 0.0);
        let b = SparseVector::from_pairs(vec![(2, 3.0), (0, 4.0)]);
        assert_eq!(b.indices, vec![0, 2]);
        assert!((a.cosine(&b) - 0.8).abs() < 1e-12);
    }
}
