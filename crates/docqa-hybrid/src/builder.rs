use docqa_core::error::{Error, Result};
use docqa_text::Bm25Index;
use docqa_vector::VectorIndex;

use crate::store::{ArtifactSet, ArtifactStore};

/// Builds both indexes over one chunk sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexBuilder;

impl IndexBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Validate `chunks` and fit the lexical and vector indexes. Nothing is
    /// written; see [`IndexBuilder::build_and_save`].
    pub fn build(&self, chunks: &[String]) -> Result<ArtifactSet> {
        validate_chunks(chunks)?;
        let lexical = Bm25Index::fit(chunks)?;
        let vector = VectorIndex::build(chunks)?;
        Ok(ArtifactSet { chunks: chunks.to_vec(), lexical, vector })
    }

    /// Build and hand all three artifacts to `store` as one unit. Validation
    /// failures leave the store untouched.
    pub fn build_and_save(&self, chunks: &[String], store: &dyn ArtifactStore) -> Result<ArtifactSet> {
        let set = self.build(chunks)?;
        store.save_all(&set.chunks, &set.lexical, &set.vector)?;
        tracing::info!(chunks = set.chunks.len(), "indexes built and saved");
        Ok(set)
    }
}

fn validate_chunks(chunks: &[String]) -> Result<()> {
    if chunks.is_empty() {
        return Err(Error::validation("chunk list must not be empty"));
    }
    if let Some(pos) = chunks.iter().position(|c| c.trim().is_empty()) {
        return Err(Error::validation(format!("chunk {pos} is empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_chunk_is_rejected_with_position() {
        let err = IndexBuilder::new()
            .build(&["fine text".to_string(), "   ".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("chunk 1"));
    }

    #[test]
    fn built_set_is_consistent() {
        let chunks = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        let set = IndexBuilder::new().build(&chunks).expect("build");
        set.check().expect("consistent");
        assert_eq!(set.chunks, chunks);
    }
}
