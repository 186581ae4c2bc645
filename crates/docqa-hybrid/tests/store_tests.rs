use std::fs;

use docqa_core::error::Error;
use docqa_hybrid::store::CURRENT_FILE;
use docqa_hybrid::{ArtifactSet, ArtifactStore, FsArtifactStore, HybridRetriever, IndexBuilder, MemoryArtifactStore};
use tempfile::TempDir;

fn chunks(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn reload_scores_identically() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    let built = IndexBuilder::new()
        .build_and_save(&chunks(&["The cat sat on the mat.", "Dogs bark loudly."]), &store)
        .expect("build");
    let loaded = store.load_all().expect("load");
    assert_eq!(loaded, built);
    let retriever = HybridRetriever::new();
    assert_eq!(retriever.score(&loaded, "cat bark").unwrap(), retriever.score(&built, "cat bark").unwrap());
}

#[test]
fn new_ingestion_switches_generation_and_keeps_previous_one() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    let builder = IndexBuilder::new();
    builder.build_and_save(&chunks(&["first corpus text"]), &store).unwrap();
    assert_eq!(store.current_generation().unwrap().as_deref(), Some("gen-1"));

    builder.build_and_save(&chunks(&["second corpus", "with two chunks"]), &store).unwrap();
    assert_eq!(fs::read_to_string(tmp.path().join(CURRENT_FILE)).unwrap(), "gen-2");
    assert!(tmp.path().join("gen-1").exists());
    assert_eq!(store.load_chunks().unwrap(), chunks(&["second corpus", "with two chunks"]));

    builder.build_and_save(&chunks(&["third corpus"]), &store).unwrap();
    assert!(!tmp.path().join("gen-1").exists());
    assert!(tmp.path().join("gen-2").exists());
}

#[test]
fn reader_pinned_before_publish_sees_only_the_old_corpus() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    let builder = IndexBuilder::new();
    let old = builder
        .build_and_save(&chunks(&["apples grow on trees", "boats float on water"]), &store)
        .unwrap();

    // a reader resolves the live generation, then a writer publishes
    let pinned = store.current_generation().unwrap().unwrap();
    let new = builder
        .build_and_save(&chunks(&["rockets launch to orbit", "engines burn fuel hot"]), &store)
        .unwrap();

    let seen_by_reader = store.load_generation(&pinned).unwrap();
    assert_eq!(seen_by_reader, old);
    assert_eq!(store.load_all().unwrap(), new);

    let hits = HybridRetriever::new().retrieve(&store.load_all().unwrap(), "rockets", 1).unwrap();
    assert_eq!(hits[0].text, "rockets launch to orbit");
}

#[test]
fn artifacts_from_different_generations_do_not_combine() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    let builder = IndexBuilder::new();
    builder.build_and_save(&chunks(&["apples grow on trees", "boats float on water"]), &store).unwrap();
    let stale_chunks = store.load_chunks().unwrap();
    builder.build_and_save(&chunks(&["rockets launch to orbit now", "engines burn fuel"]), &store).unwrap();

    let mixed = ArtifactSet {
        chunks: stale_chunks,
        lexical: store.load_lexical_index().unwrap(),
        vector: store.load_vector_index().unwrap(),
    };
    assert!(matches!(mixed.check(), Err(Error::Operation(_))));
}

#[test]
fn generation_directory_holds_only_final_artifacts() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    IndexBuilder::new().build_and_save(&chunks(&["durable text"]), &store).unwrap();
    let mut names: Vec<String> = fs::read_dir(tmp.path().join("gen-1"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["bm25.json", "chunks.json", "tfidf.json"]);
}

#[test]
fn empty_ingestion_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    let builder = IndexBuilder::new();
    builder.build_and_save(&chunks(&["kept corpus"]), &store).unwrap();

    assert!(matches!(builder.build_and_save(&[], &store), Err(Error::Validation(_))));
    assert!(matches!(builder.build_and_save(&chunks(&["ok", " "]), &store), Err(Error::Validation(_))));
    assert_eq!(store.current_generation().unwrap().as_deref(), Some("gen-1"));
    assert_eq!(store.load_chunks().unwrap(), chunks(&["kept corpus"]));
}

#[test]
fn corrupt_artifact_is_reported() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    IndexBuilder::new().build_and_save(&chunks(&["some text here"]), &store).unwrap();
    fs::write(tmp.path().join("gen-1").join("bm25.json"), "{not json").unwrap();
    let err = store.load_all().unwrap_err();
    assert!(matches!(err, Error::Artifact { ref name, .. } if name == "bm25.json"), "{err}");
}

#[test]
fn mismatched_chunk_count_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    IndexBuilder::new().build_and_save(&chunks(&["alpha text", "beta text"]), &store).unwrap();
    fs::write(tmp.path().join("gen-1").join("chunks.json"), r#"["alpha text"]"#).unwrap();
    assert!(matches!(store.load_all(), Err(Error::Operation(_))));
}

#[test]
fn memory_store_round_trips() {
    let store = MemoryArtifactStore::new();
    let set = IndexBuilder::new().build_and_save(&chunks(&["memory backed corpus"]), &store).unwrap();
    assert_eq!(store.load_all().unwrap(), set);
}
