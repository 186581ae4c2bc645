use std::sync::Arc;

use docqa_core::types::Candidate;
use docqa_vector::FittedVectorizer;

/// Re-orders candidates by TF-IDF cosine similarity to the query.
pub struct Reranker {
    vectorizer: Arc<FittedVectorizer>,
}

impl Reranker {
    pub fn new(vectorizer: Arc<FittedVectorizer>) -> Self {
        Self { vectorizer }
    }

    /// Candidate texts, most similar first. Equal similarities keep their
    /// incoming order.
    pub fn rerank(&self, query: &str, candidates: &[Candidate]) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let q = self.vectorizer.transform(query);
        let mut scored: Vec<(f64, &Candidate)> = candidates
            .iter()
            .map(|c| (self.vectorizer.transform(&c.text).cosine(&q), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, c)| c.text.clone()).collect()
    }
}
