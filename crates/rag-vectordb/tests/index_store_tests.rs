//! Index Store loading, alignment and resolution tests.

use std::sync::Arc;

use rag_core::{MetadataRecord, RagError};
use rag_vectordb::{
    distance::DistanceMetric,
    error::VectorDbError,
    index::{FlatIndex, VectorIndex},
    store::{IndexStore, LocalDirSource},
};
use rag_core::config::{StoreConfig, StoreLocation};
use tempfile::TempDir;

const INDEX_FILE: &str = "vectorstore.index";
const META_FILE: &str = "vectorstore_meta.json";

fn fixture() -> (FlatIndex, Vec<MetadataRecord>) {
    let vectors = vec![
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![0.5, 0.5, 0.5, 0.5],
    ];
    let snippets = [
        "Apply for a student visa at least three months before departure.",
        "University dormitories open applications in June.",
        "Open a local bank account with your passport and enrollment letter.",
        "Health insurance is mandatory for international students.",
        "Register your address within two weeks of arrival.",
    ];
    let index = FlatIndex::from_vectors(4, DistanceMetric::L2, &vectors).unwrap();
    let metadata = snippets
        .iter()
        .enumerate()
        .map(|(i, s)| MetadataRecord::new(*s).with_source(format!("guide.pdf#{i}")))
        .collect();
    (index, metadata)
}

fn write_fixture(dir: &std::path::Path) {
    let (index, metadata) = fixture();
    IndexStore::save_to_dir(&index, &metadata, dir, INDEX_FILE, META_FILE).unwrap();
}

// ============================================================
// Alignment
// ============================================================

#[test]
fn test_metadata_length_matches_vector_count() {
    let (index, metadata) = fixture();
    let store = IndexStore::new(Arc::new(index), metadata).unwrap();
    assert_eq!(store.len(), store.index().len());
    assert_eq!(store.len(), 5);
}

#[test]
fn test_row_lookup_returns_expected_snippet() {
    let (index, metadata) = fixture();
    let store = IndexStore::new(Arc::new(index), metadata).unwrap();
    assert!(store.record(2).unwrap().text_snippet.contains("bank account"));
    assert_eq!(store.record(4).unwrap().source.as_deref(), Some("guide.pdf#4"));
    assert!(store.record(5).is_none());
}

#[test]
fn test_misaligned_metadata_rejected() {
    let (index, mut metadata) = fixture();
    metadata.pop();
    let err = IndexStore::new(Arc::new(index), metadata).unwrap_err();
    assert!(matches!(err, VectorDbError::Misaligned { vectors: 5, records: 4 }));
    assert!(matches!(RagError::from(err), RagError::CorruptIndex(_)));
}

// ============================================================
// Loading
// ============================================================

#[tokio::test]
async fn test_load_from_local_dir() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());

    let source = LocalDirSource::new(tmp.path());
    let store = IndexStore::load(&source, INDEX_FILE, META_FILE).await.unwrap();
    assert_eq!(store.len(), 5);
    assert_eq!(store.dimension(), 4);
    assert_eq!(store.metric(), DistanceMetric::L2);
}

#[tokio::test]
async fn test_load_from_config_missing_dir_is_store_unavailable() {
    let tmp = TempDir::new().unwrap();
    let cfg = StoreConfig {
        location: StoreLocation::Dir(tmp.path().join("nope")),
        ..StoreConfig::default()
    };
    let err = IndexStore::load_from_config(&cfg).await.unwrap_err();
    assert!(matches!(err, RagError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_load_corrupt_index_file() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    std::fs::write(tmp.path().join(INDEX_FILE), b"RAGX garbage").unwrap();

    let cfg = StoreConfig {
        location: StoreLocation::Dir(tmp.path().to_path_buf()),
        ..StoreConfig::default()
    };
    let err = IndexStore::load_from_config(&cfg).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex(_)));
}

#[tokio::test]
async fn test_load_metadata_count_mismatch() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    std::fs::write(tmp.path().join(META_FILE), br#"[{"text_snippet": "only one"}]"#).unwrap();

    let source = LocalDirSource::new(tmp.path());
    let err = IndexStore::load(&source, INDEX_FILE, META_FILE).await.unwrap_err();
    assert!(matches!(err, VectorDbError::Misaligned { .. }));
}

#[tokio::test]
async fn test_load_jsonl_metadata() {
    let tmp = TempDir::new().unwrap();
    write_fixture(tmp.path());
    let jsonl: String = (0..5).map(|i| format!("{{\"text_snippet\": \"line {i}\"}}\n")).collect();
    std::fs::write(tmp.path().join(META_FILE), jsonl).unwrap();

    let source = LocalDirSource::new(tmp.path());
    let store = IndexStore::load(&source, INDEX_FILE, META_FILE).await.unwrap();
    assert_eq!(store.record(3).unwrap().text_snippet, "line 3");
}

#[test]
fn test_save_rejects_misaligned() {
    let tmp = TempDir::new().unwrap();
    let (index, metadata) = fixture();
    let err = IndexStore::save_to_dir(&index, &metadata[..2], tmp.path(), INDEX_FILE, META_FILE);
    assert!(err.is_err());
    assert!(!tmp.path().join(INDEX_FILE).exists());
}

// ============================================================
// Search + resolution
// ============================================================

#[test]
fn test_query_equal_to_stored_vector_is_nearest() {
    let (index, metadata) = fixture();
    let stored: Vec<Vec<f32>> = (0..5).map(|j| index.vector(j).unwrap().to_vec()).collect();
    let store = IndexStore::new(Arc::new(index), metadata).unwrap();
    for (j, q) in stored.iter().enumerate() {
        let res = store.search_resolved(q, 1).unwrap();
        assert_eq!(res.chunks[0].row, j);
        assert!(res.chunks[0].distance.abs() < 1e-6);
    }
}

#[test]
fn test_resolved_results_nearest_first() {
    let (index, metadata) = fixture();
    let store = IndexStore::new(Arc::new(index), metadata).unwrap();
    let res = store.search_resolved(&[0.9, 0.1, 0.0, 0.0], 5).unwrap();
    assert_eq!(res.len(), 5);
    assert_eq!(res.chunks[0].row, 0);
    for pair in res.chunks.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    assert_eq!(res.chunks[0].record.text_snippet, store.record(0).unwrap().text_snippet);
}

#[test]
fn test_k_larger_than_index_returns_all() {
    let (index, metadata) = fixture();
    let store = IndexStore::new(Arc::new(index), metadata).unwrap();
    assert_eq!(store.search_resolved(&[0.0; 4], 100).unwrap().len(), store.len());
}
