//! Request orchestration: ingestion, retrieval, re-ranking and generation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use docqa_core::chunker::{Chunker, ChunkingConfig};
use docqa_core::config::Settings;
use docqa_core::error::{Error, Result};
use docqa_core::prompt::NO_CONTEXT_ANSWER;
use docqa_core::traits::AnswerGenerator;
use docqa_core::types::IngestReport;

use crate::builder::IndexBuilder;
use crate::retriever::HybridRetriever;
use crate::reranker::Reranker;
use crate::store::{ArtifactSet, ArtifactStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagRequest {
    /// Raw text to ingest before answering, with a display name.
    pub source: Option<SourceText>,
    pub question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceText {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub status: String,
    pub source: Option<String>,
    pub chunks_created: Option<usize>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

pub struct RagPipeline {
    store: Box<dyn ArtifactStore>,
    settings: Settings,
    chunker: Chunker,
    generator: Option<Box<dyn AnswerGenerator>>,
    snapshot: RwLock<Option<Arc<ArtifactSet>>>,
}

impl RagPipeline {
    /// Rejects invalid `settings`. The stored corpus, if any, is loaded
    /// lazily on the first query.
    pub fn new(
        store: Box<dyn ArtifactStore>,
        settings: Settings,
        generator: Option<Box<dyn AnswerGenerator>>,
    ) -> Result<Self> {
        settings.validate()?;
        let chunker = Chunker::new(ChunkingConfig {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
        });
        Ok(Self { store, settings, chunker, generator, snapshot: RwLock::new(None) })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current corpus version; loads it from the store on first use.
    pub fn snapshot(&self) -> Result<Arc<ArtifactSet>> {
        if let Some(set) = self.snapshot.read().as_ref() {
            return Ok(Arc::clone(set));
        }
        let mut slot = self.snapshot.write();
        if let Some(set) = slot.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(self.store.load_all()?);
        tracing::info!(chunks = set.chunks.len(), "loaded stored corpus");
        *slot = Some(Arc::clone(&set));
        Ok(set)
    }

    pub fn ingest_text(&self, name: &str, text: &str) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(Error::validation(format!("No text could be extracted from {name}")));
        }
        let chunks_created = self.ingest_chunks(&chunks)?;
        Ok(IngestReport { source: name.to_string(), chunks_created })
    }

    /// Replace the corpus with `chunks`. Readers keep the previous snapshot
    /// until the new one is saved.
    pub fn ingest_chunks(&self, chunks: &[String]) -> Result<usize> {
        let mut slot = self.snapshot.write();
        let set = IndexBuilder::new().build_and_save(chunks, self.store.as_ref())?;
        let count = set.chunks.len();
        *slot = Some(Arc::new(set));
        tracing::info!(chunks = count, "ingestion complete");
        Ok(count)
    }

    /// Hybrid retrieval of `k` candidates (default `top_k_retrieval`),
    /// re-ranked and cut to `top_k_context` passages.
    pub fn retrieve_passages(&self, question: &str, k: Option<usize>) -> Result<Vec<String>> {
        let set = self.snapshot()?;
        let k = k.unwrap_or(self.settings.top_k_retrieval);
        let candidates = HybridRetriever::new().retrieve(&set, question, k)?;
        if candidates.is_empty() {
            tracing::warn!("retrieval returned no candidates");
        }
        let mut passages = Reranker::new(Arc::clone(set.vector.vectorizer())).rerank(question, &candidates);
        passages.truncate(self.settings.top_k_context);
        Ok(passages)
    }

    /// Answer from the retrieved passages. Without passages the generator is
    /// not consulted and [`NO_CONTEXT_ANSWER`] is returned.
    pub fn answer(&self, question: &str) -> Result<String> {
        let passages = self.retrieve_passages(question, None)?;
        if passages.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("no answer generator configured".into()))?;
        generator.generate(question, &passages)
    }

    pub fn handle(&self, request: RagRequest) -> Result<RagResponse> {
        let question = request.question.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        if request.source.is_none() && question.is_none() {
            return Err(Error::validation("Provide a source, a question, or both"));
        }
        let mut response = RagResponse {
            status: "success".into(),
            source: None,
            chunks_created: None,
            question: None,
            answer: None,
        };
        if let Some(source) = request.source {
            let report = self.ingest_text(&source.name, &source.text)?;
            response.source = Some(report.source);
            response.chunks_created = Some(report.chunks_created);
        }
        if let Some(question) = question {
            response.answer = Some(self.answer(&question)?);
            response.question = Some(question);
        }
        Ok(response)
    }
}
