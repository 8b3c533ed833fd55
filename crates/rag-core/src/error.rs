use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),
    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("Embedding request failed: {0}")]
    EmbeddingFailed(String),
    #[error("Service not ready: {0}")]
    NotReady(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Answer generator is not configured")]
    GeneratorUnconfigured,
    #[error("Answer generator unavailable: {message}")]
    GeneratorUnavailable { message: String, timed_out: bool },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RagError {
    pub fn generator_unavailable(message: impl Into<String>) -> Self {
        Self::GeneratorUnavailable { message: message.into(), timed_out: false }
    }

    pub fn generator_timeout(message: impl Into<String>) -> Self {
        Self::GeneratorUnavailable { message: message.into(), timed_out: true }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotReady(_) | Self::GeneratorUnavailable { .. } | Self::EmbeddingFailed(_)
        )
    }

    /// Errors that must abort process initialization.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_)
                | Self::CorruptIndex(_)
                | Self::EmbeddingUnavailable(_)
                | Self::Config(_)
        )
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::CorruptIndex(_) => "corrupt_index",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::EmbeddingFailed(_) => "embedding_failed",
            Self::NotReady(_) => "not_ready",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::GeneratorUnconfigured => "generator_unconfigured",
            Self::GeneratorUnavailable { .. } => "generator_unavailable",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Other(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
