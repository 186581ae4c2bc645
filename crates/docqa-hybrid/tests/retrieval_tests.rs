use std::sync::Arc;

use docqa_core::error::Error;
use docqa_core::types::Candidate;
use docqa_hybrid::{ArtifactSet, HybridRetriever, IndexBuilder, Reranker};
use proptest::prelude::*;

fn pets() -> ArtifactSet {
    let chunks: Vec<String> = ["The cat sat on the mat.", "Dogs bark loudly.", "Cats and dogs are pets."]
        .iter()
        .map(|s| s.to_string())
        .collect();
    IndexBuilder::new().build(&chunks).expect("build")
}

#[test]
fn cat_query_ranks_first_chunk_then_ties_by_higher_id() {
    let set = pets();
    let hits = HybridRetriever::new().retrieve(&set, "cat", 2).expect("retrieve");
    let ids: Vec<usize> = hits.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(hits[0].text, "The cat sat on the mat.");
    assert!((hits[0].score - 1.0).abs() < 1e-12);
}

#[test]
fn no_overlap_returns_zero_scores_for_every_chunk() {
    let set = pets();
    let breakdown = HybridRetriever::new().score(&set, "zeppelin").expect("score");
    assert_eq!(breakdown.fused, vec![0.0; 3]);
    let hits = HybridRetriever::new().retrieve(&set, "zeppelin", 10).expect("retrieve");
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|c| c.score == 0.0));
}

#[test]
fn empty_query_and_zero_k_are_rejected() {
    let set = pets();
    let retriever = HybridRetriever::new();
    assert!(matches!(retriever.retrieve(&set, "   ", 3), Err(Error::Validation(_))));
    assert!(matches!(retriever.retrieve(&set, "cat", 0), Err(Error::Validation(_))));
}

#[test]
fn repeated_queries_score_identically() {
    let set = pets();
    let retriever = HybridRetriever::new();
    let first = retriever.score(&set, "dogs bark").expect("score");
    let second = retriever.score(&set, "dogs bark").expect("score");
    assert_eq!(first, second);
    assert_eq!(set, pets());
}

#[test]
fn rerank_of_nothing_is_nothing() {
    let set = pets();
    let reranker = Reranker::new(Arc::clone(set.vector.vectorizer()));
    assert!(reranker.rerank("cat", &[]).is_empty());
}

#[test]
fn rerank_orders_by_similarity_and_keeps_ties_stable() {
    let set = pets();
    let reranker = Reranker::new(Arc::clone(set.vector.vectorizer()));
    let candidates: Vec<Candidate> = [(1, "Dogs bark loudly."), (2, "Cats and dogs are pets."), (0, "The cat sat on the mat.")]
        .into_iter()
        .map(|(id, text)| Candidate { id, text: text.to_string(), score: 0.0 })
        .collect();
    let out = reranker.rerank("cat", &candidates);
    assert_eq!(out, vec!["The cat sat on the mat.", "Dogs bark loudly.", "Cats and dogs are pets."]);
}

proptest! {
    #[test]
    fn rerank_is_a_permutation(picks in prop::collection::vec(0usize..3, 0..8), q in "(cat|dogs|pets|mat|bark)( (cat|dogs|pets)){0,2}") {
        let set = pets();
        let reranker = Reranker::new(Arc::clone(set.vector.vectorizer()));
        let candidates: Vec<Candidate> = picks
            .iter()
            .map(|&id| Candidate { id, text: set.chunks[id].clone(), score: 0.0 })
            .collect();
        let mut out = reranker.rerank(&q, &candidates);
        let mut expected: Vec<String> = candidates.into_iter().map(|c| c.text).collect();
        out.sort();
        expected.sort();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn retrieve_returns_min_k_n(k in 1usize..8, q in "(cat|dogs|bark|zebra)") {
        let set = pets();
        let hits = HybridRetriever::new().retrieve(&set, &q, k).expect("retrieve");
        prop_assert_eq!(hits.len(), k.min(3));
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
