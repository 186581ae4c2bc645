//! Persistence for the chunk sequence and both indexes.
//!
//! The three artifacts always travel together as an [`ArtifactSet`]. On disk
//! each ingestion writes a fresh `gen-<n>` directory and then publishes it by
//! atomically replacing the `CURRENT` pointer file.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docqa_core::error::{Error, Result};
use docqa_text::tokenize::whitespace_tokens;
use docqa_text::Bm25Index;
use docqa_vector::VectorIndex;

pub const CURRENT_FILE: &str = "CURRENT";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const LEXICAL_FILE: &str = "bm25.json";
pub const VECTOR_FILE: &str = "tfidf.json";

const GENERATION_PREFIX: &str = "gen-";

/// One corpus version: chunk texts plus the indexes built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub chunks: Vec<String>,
    pub lexical: Bm25Index,
    pub vector: VectorIndex,
}

impl ArtifactSet {
    /// Every index must cover exactly the stored chunk sequence.
    pub fn check(&self) -> Result<()> {
        let n = self.chunks.len();
        if self.lexical.len() != n || self.vector.len() != n {
            return Err(Error::Operation(format!(
                "artifact set out of sync: {} chunks, lexical index covers {}, vector index covers {}",
                n,
                self.lexical.len(),
                self.vector.len()
            )));
        }
        if let Some(id) = self
            .chunks
            .iter()
            .zip(self.lexical.chunk_lens())
            .position(|(chunk, &len)| whitespace_tokens(chunk).len() != len)
        {
            return Err(Error::Operation(format!("lexical index does not match chunk {id}")));
        }
        self.vector.check()
    }
}

pub trait ArtifactStore: Send + Sync {
    fn load_chunks(&self) -> Result<Vec<String>>;
    fn load_lexical_index(&self) -> Result<Bm25Index>;
    fn load_vector_index(&self) -> Result<VectorIndex>;

    /// Replace the stored corpus wholesale.
    fn save_all(&self, chunks: &[String], lexical: &Bm25Index, vector: &VectorIndex) -> Result<()>;

    fn load_all(&self) -> Result<ArtifactSet> {
        let set = ArtifactSet {
            chunks: self.load_chunks()?,
            lexical: self.load_lexical_index()?,
            vector: self.load_vector_index()?,
        };
        set.check()?;
        Ok(set)
    }
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for Arc<S> {
    fn load_chunks(&self) -> Result<Vec<String>> {
        (**self).load_chunks()
    }
    fn load_lexical_index(&self) -> Result<Bm25Index> {
        (**self).load_lexical_index()
    }
    fn load_vector_index(&self) -> Result<VectorIndex> {
        (**self).load_vector_index()
    }
    fn save_all(&self, chunks: &[String], lexical: &Bm25Index, vector: &VectorIndex) -> Result<()> {
        (**self).save_all(chunks, lexical, vector)
    }
    fn load_all(&self) -> Result<ArtifactSet> {
        (**self).load_all()
    }
}

/// Filesystem store rooted at `storage_dir`.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the live generation directory, if any corpus was published.
    pub fn current_generation(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(name) => {
                let name = name.trim().to_string();
                Ok(if name.is_empty() { None } else { Some(name) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn live_generation(&self) -> Result<String> {
        self.current_generation()?
            .ok_or_else(|| Error::not_found(format!("no corpus ingested under {}", self.root.display())))
    }

    fn read_artifact<T: DeserializeOwned>(&self, dir: &Path, file: &str) -> Result<T> {
        let path = dir.join(file);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found(format!("missing artifact {}", path.display())),
            _ => Error::Io(e),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Artifact { name: file.to_string(), source })
    }

    fn read_live<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let dir = self.root.join(self.live_generation()?);
        self.read_artifact(&dir, file)
    }

    /// Read all three artifacts from one generation directory.
    pub fn load_generation(&self, generation: &str) -> Result<ArtifactSet> {
        let dir = self.root.join(generation);
        let set = ArtifactSet {
            chunks: self.read_artifact(&dir, CHUNKS_FILE)?,
            lexical: self.read_artifact(&dir, LEXICAL_FILE)?,
            vector: self.read_artifact(&dir, VECTOR_FILE)?,
        };
        set.check()?;
        Ok(set)
    }

    fn next_generation(&self) -> Result<u64> {
        let mut highest = 0;
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(n) = generation_number(&name.to_string_lossy()) {
                highest = highest.max(n);
            }
        }
        Ok(highest + 1)
    }

    /// Drop every generation older than the one `live` replaced. The previous
    /// generation stays so readers that resolved it before the publish can
    /// finish.
    fn remove_stale_generations(&self, live: u64) {
        let Ok(entries) = fs::read_dir(&self.root) else { return };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(n) = generation_number(&name) else { continue };
            if n + 1 < live {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    tracing::warn!(generation = %name, error = %e, "failed to remove stale generation");
                }
            }
        }
    }
}

fn generation_number(name: &str) -> Option<u64> {
    name.strip_prefix(GENERATION_PREFIX)?.parse().ok()
}

/// Write `bytes` to `dir/file` through a synced temp file and a rename.
fn write_synced(dir: &Path, file: &str, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(file)).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, file: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| Error::Artifact { name: file.to_string(), source })?;
    write_synced(dir, file, &bytes)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

impl ArtifactStore for FsArtifactStore {
    fn load_chunks(&self) -> Result<Vec<String>> {
        self.read_live(CHUNKS_FILE)
    }

    fn load_lexical_index(&self) -> Result<Bm25Index> {
        self.read_live(LEXICAL_FILE)
    }

    fn load_vector_index(&self) -> Result<VectorIndex> {
        self.read_live(VECTOR_FILE)
    }

    /// Resolves `CURRENT` once so all three artifacts come from the same
    /// generation.
    fn load_all(&self) -> Result<ArtifactSet> {
        let generation = self.live_generation()?;
        match self.load_generation(&generation) {
            // pointer moved on twice while we were reading: take the new one
            Err(Error::NotFound(_)) if self.current_generation()?.as_deref() != Some(generation.as_str()) => {
                self.load_generation(&self.live_generation()?)
            }
            other => other,
        }
    }

    fn save_all(&self, chunks: &[String], lexical: &Bm25Index, vector: &VectorIndex) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let number = self.next_generation()?;
        let generation = format!("{GENERATION_PREFIX}{number}");
        let dir = self.root.join(&generation);
        fs::create_dir_all(&dir)?;
        write_json(&dir, CHUNKS_FILE, chunks)?;
        write_json(&dir, LEXICAL_FILE, lexical)?;
        write_json(&dir, VECTOR_FILE, vector)?;
        sync_dir(&dir)?;

        write_synced(&self.root, CURRENT_FILE, generation.as_bytes())?;
        sync_dir(&self.root)?;
        tracing::info!(generation = %generation, chunks = chunks.len(), "published artifact generation");

        self.remove_stale_generations(number);
        Ok(())
    }
}

/// In-process store, mainly for tests and embedding.
#[derive(Default)]
pub struct MemoryArtifactStore {
    current: Mutex<Option<ArtifactSet>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_current<T>(&self, f: impl FnOnce(&ArtifactSet) -> T) -> Result<T> {
        self.current
            .lock()
            .as_ref()
            .map(f)
            .ok_or_else(|| Error::not_found("no corpus ingested"))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load_chunks(&self) -> Result<Vec<String>> {
        self.with_current(|s| s.chunks.clone())
    }

    fn load_lexical_index(&self) -> Result<Bm25Index> {
        self.with_current(|s| s.lexical.clone())
    }

    fn load_vector_index(&self) -> Result<VectorIndex> {
        self.with_current(|s| s.vector.clone())
    }

    fn save_all(&self, chunks: &[String], lexical: &Bm25Index, vector: &VectorIndex) -> Result<()> {
        *self.current.lock() = Some(ArtifactSet {
            chunks: chunks.to_vec(),
            lexical: lexical.clone(),
            vector: vector.clone(),
        });
        Ok(())
    }

    fn load_all(&self) -> Result<ArtifactSet> {
        self.with_current(Clone::clone)
    }
}
