use std::sync::Arc;

use rag_core::types::{validate_question, validate_top_k};
use rag_core::{RagError, Result, RetrievalResult};
use rag_vectordb::IndexStore;
use tracing::{debug, instrument};

use crate::embedder::Embedder;

/// Embeds a question and returns the nearest indexed snippets.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<IndexStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: Arc<IndexStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Up to `k` neighbours, nearest first. Fewer are returned when the index
    /// is smaller than `k`.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn retrieve(&self, question: &str, k: i64) -> Result<RetrievalResult> {
        let k = validate_top_k(k)?;
        validate_question(question)?;

        let query = self.embedder.encode(question).await?;

        // Flat search is CPU-bound; keep it off the async workers.
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || store.search_resolved(&query, k))
            .await
            .map_err(|e| RagError::Other(anyhow::anyhow!("search task failed: {e}")))??;

        debug!(hits = result.len(), rows = ?result.rows(), "retrieved");
        Ok(result)
    }
}
