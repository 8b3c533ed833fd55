use rag_core::RagError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Invalid index format: {0}")]
    Format(String),
    #[error("Invalid metadata: {0}")]
    Metadata(String),
    #[error("Index/metadata misaligned: index holds {vectors} vectors, metadata holds {records} records")]
    Misaligned { vectors: usize, records: usize },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Artifact fetch failed for {name}: {message}")]
    Fetch { name: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VectorDbError>;

impl From<VectorDbError> for RagError {
    fn from(err: VectorDbError) -> Self {
        match err {
            VectorDbError::Io(_) | VectorDbError::Fetch { .. } => {
                RagError::StoreUnavailable(err.to_string())
            }
            VectorDbError::DimensionMismatch { .. }
            | VectorDbError::Format(_)
            | VectorDbError::Metadata(_)
            | VectorDbError::Misaligned { .. } => RagError::CorruptIndex(err.to_string()),
            VectorDbError::InvalidQuery(msg) => RagError::EmbeddingFailed(msg),
            VectorDbError::Other(e) => RagError::Other(e),
        }
    }
}
