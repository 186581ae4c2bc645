//! Domain types shared by the lexical, vector and hybrid crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Position of a chunk in the persisted chunk sequence.
pub type ChunkId = usize;

/// A chunk that survived hybrid fusion.
///
/// `score` is the fused relevance in `[0, 1]`; the order of a candidate list
/// is significant until the re-ranker assigns a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ChunkId,
    pub text: String,
    pub score: f64,
}

/// Raw document text handed to the chunker.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Display name, usually the file name.
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub chunks_created: usize,
}
