//! Hybrid retrieval over a persisted corpus: artifact storage, index building,
//! BM25 + TF-IDF fusion, re-ranking and the question-answering pipeline.

pub mod builder;
pub mod generator;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod store;

pub use builder::IndexBuilder;
pub use generator::ChatCompletionsGenerator;
pub use pipeline::{RagPipeline, RagRequest, RagResponse, SourceText};
pub use reranker::Reranker;
pub use retriever::{HybridRetriever, ScoreBreakdown};
pub use store::{ArtifactSet, ArtifactStore, FsArtifactStore, MemoryArtifactStore};
