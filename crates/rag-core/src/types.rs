use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RagError, Result};

/// Default number of neighbours retrieved when a request does not say.
pub const DEFAULT_TOP_K: usize = 3;

/// One metadata record per indexed vector; row `i` of the index is described
/// by record `i` of the metadata sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub text_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Provenance fields the core logic does not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MetadataRecord {
    pub fn new(text_snippet: impl Into<String>) -> Self {
        Self {
            text_snippet: text_snippet.into(),
            source: None,
            offset: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Body of `POST /ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Signed so that zero and negative values reach validation instead of
    /// failing deserialization.
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), top_k: None }
    }

    pub fn with_top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Requested `top_k`, or `default` when absent.
    pub fn top_k_or(&self, default: usize) -> i64 {
        self.top_k.unwrap_or(default as i64)
    }

    pub fn validate(&self) -> Result<()> {
        validate_question(&self.question)
    }
}

pub fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidArgument("question must not be empty".into()));
    }
    Ok(())
}

/// Checks a caller-supplied neighbour count and converts it to `usize`.
pub fn validate_top_k(k: i64) -> Result<usize> {
    if k <= 0 {
        return Err(RagError::InvalidArgument(format!(
            "top_k must be a positive integer, got {k}"
        )));
    }
    usize::try_from(k).map_err(|_| RagError::InvalidArgument(format!("top_k out of range: {k}")))
}

/// A single retrieved neighbour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    /// Row position in the index (and in the metadata sequence).
    pub row: usize,
    /// Metric-native distance reported by the index.
    pub distance: f32,
    pub record: MetadataRecord,
}

/// Neighbours ordered nearest first. May be shorter than the requested k.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn snippets(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.record.text_snippet.as_str())
    }

    pub fn rows(&self) -> Vec<usize> {
        self.chunks.iter().map(|c| c.row).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Fixed system instruction plus a single user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
}

impl GenerationRequest {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage { role: ChatRole::System, text: self.system.clone() },
            ChatMessage { role: ChatRole::User, text: self.user.clone() },
        ]
    }
}

/// Text produced by the completion service. An empty `text` means the
/// service answered with zero alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl AnswerResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), model_version: None }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
