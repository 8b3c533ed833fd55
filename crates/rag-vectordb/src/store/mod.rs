//! Index Store: the loaded index plus its row-aligned metadata sequence.

mod artifacts;

pub use artifacts::{source_for, ArtifactSource, HttpSource, LocalDirSource};

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use rag_core::config::StoreConfig;
use rag_core::{MetadataRecord, RetrievalResult, RetrievedChunk};
use tracing::info;

use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::{FlatIndex, SearchResult, VectorIndex};
use crate::meta;

/// Read-only pairing of a vector index with one metadata record per row.
///
/// Construction checks that `metadata.len() == index.len()`; after that the
/// store never changes.
pub struct IndexStore {
    index: Arc<dyn VectorIndex>,
    metadata: Vec<MetadataRecord>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("vectors", &self.index.len())
            .field("dimension", &self.index.dimension())
            .field("metric", &self.index.metric())
            .finish()
    }
}

impl IndexStore {
    pub fn new(index: Arc<dyn VectorIndex>, metadata: Vec<MetadataRecord>) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(VectorDbError::Misaligned {
                vectors: index.len(),
                records: metadata.len(),
            });
        }
        Ok(Self { index, metadata })
    }

    /// Parse both artifacts and check alignment.
    pub fn from_bytes(index_bytes: &[u8], metadata_bytes: &[u8]) -> Result<Self> {
        let index = FlatIndex::from_bytes(index_bytes)?;
        let metadata = meta::decode(metadata_bytes)?;
        Self::new(Arc::new(index), metadata)
    }

    /// Fetch both artifacts from `source` and build the store.
    pub async fn load(source: &dyn ArtifactSource, index_name: &str, metadata_name: &str) -> Result<Self> {
        info!("loading vector store from {}", source.describe());
        let index_bytes = source.fetch(index_name).await?;
        let metadata_bytes = source.fetch(metadata_name).await?;
        let store = Self::from_bytes(&index_bytes, &metadata_bytes)?;
        info!(
            vectors = store.len(),
            dimension = store.dimension(),
            metric = %store.metric(),
            "vector store loaded"
        );
        Ok(store)
    }

    /// Load using the configured location and artifact names, mapping
    /// failures onto the service error taxonomy.
    pub async fn load_from_config(cfg: &StoreConfig) -> rag_core::Result<Self> {
        let source = source_for(&cfg.location)?;
        Ok(Self::load(source.as_ref(), &cfg.index_file, &cfg.metadata_file).await?)
    }

    /// Write both artifacts into `dir` (offline tooling and fixtures).
    pub fn save_to_dir(
        index: &FlatIndex,
        metadata: &[MetadataRecord],
        dir: &Path,
        index_name: &str,
        metadata_name: &str,
    ) -> Result<()> {
        if index.len() != metadata.len() {
            return Err(VectorDbError::Misaligned { vectors: index.len(), records: metadata.len() });
        }
        fs::create_dir_all(dir)?;
        write_atomic(&dir.join(index_name), &index.to_bytes()?)?;
        write_atomic(&dir.join(metadata_name), &meta::encode(metadata)?)?;
        Ok(())
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn metadata(&self) -> &[MetadataRecord] {
        &self.metadata
    }

    pub fn record(&self, row: usize) -> Option<&MetadataRecord> {
        self.metadata.get(row)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> Result<SearchResult> {
        self.index.search(query, top_k)
    }

    /// Attach metadata records to search hits, keeping their order.
    pub fn resolve(&self, hits: &SearchResult) -> Result<RetrievalResult> {
        let chunks = hits
            .neighbors
            .iter()
            .map(|n| {
                let record = self.record(n.row).ok_or(VectorDbError::Misaligned {
                    vectors: n.row + 1,
                    records: self.metadata.len(),
                })?;
                Ok(RetrievedChunk { row: n.row, distance: n.distance, record: record.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RetrievalResult::new(chunks))
    }

    /// Nearest-neighbour search followed by metadata resolution.
    pub fn search_resolved(&self, query: &[f32], top_k: usize) -> Result<RetrievalResult> {
        let hits = self.search(query, top_k)?;
        self.resolve(&hits)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let result = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
