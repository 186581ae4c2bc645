//! Vector-space retrieval: a TF-IDF vectorizer with English stop words
//! removed and a sparse document-term matrix scored by cosine similarity.

pub mod analyzer;
pub mod tfidf;

pub use tfidf::{DocumentTermMatrix, FittedVectorizer, SparseVector, VectorIndex};
