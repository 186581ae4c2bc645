//! docqa-text
//!
//! Okapi BM25 lexical index over whitespace-tokenized chunks. The index keeps
//! per-chunk term frequencies and the idf table so a persisted copy scores
//! queries without re-tokenizing the corpus.

pub mod bm25;
pub mod tokenize;

pub use bm25::{Bm25Index, Bm25Params};
