//! Shared types, error taxonomy and configuration for the RAG service.

pub mod config;
pub mod error;
pub mod types;

pub use config::RagConfig;
pub use error::{RagError, Result};
pub use types::{
    AnswerResult, ChatMessage, ChatRole, GenerationRequest, MetadataRecord, QueryRequest,
    RetrievalResult, RetrievedChunk,
};
