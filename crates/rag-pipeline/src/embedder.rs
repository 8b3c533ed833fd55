//! Text embedding through an OpenAI-compatible `/v1/embeddings` endpoint
//! (for example a text-embeddings-inference server hosting all-MiniLM-L6-v2).

use async_trait::async_trait;
use rag_core::config::EmbeddingConfig;
use rag_core::{RagError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maps text to a fixed-dimension vector. Deterministic for a fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

const PROBE_TEXT: &str = "embedding model warm-up";

/// Remote embedding model client. Built with [`HttpEmbedder::connect`],
/// which verifies the model answers before the service starts.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    client: Client,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl HttpEmbedder {
    /// Connect eagerly: one probe request establishes that the model is
    /// loaded and fixes the vector dimension.
    pub async fn connect(cfg: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| RagError::EmbeddingUnavailable(format!("HTTP client: {e}")))?;
        let mut embedder = Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            dimension: 0,
            client,
        };

        let probe = embedder
            .call_api(&[PROBE_TEXT.to_string()])
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(format!("{}: {e}", embedder.model)))?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(RagError::EmbeddingUnavailable(format!(
                "{} returned an empty embedding",
                embedder.model
            )));
        }
        embedder.dimension = dimension;
        info!(model = %embedder.model, dimension, "embedding model ready");
        Ok(embedder)
    }

    async fn call_api(&self, input: &[String]) -> std::result::Result<Vec<Vec<f32>>, String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { model: &self.model, input });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| format!("request failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {body}"));
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(|e| format!("bad response: {e}"))?;
        if parsed.data.len() != input.len() {
            return Err(format!(
                "expected {} embeddings, got {}",
                input.len(),
                parsed.data.len()
            ));
        }
        parsed.data.sort_by_key(|d| d.index.unwrap_or(0));
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn check_dimension(&self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::EmbeddingFailed(format!(
                "model returned {} dimensions, expected {}",
                v.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.encode_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::EmbeddingFailed("no embedding returned".into()))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), "embedding texts");
        let vectors = self.call_api(texts).await.map_err(RagError::EmbeddingFailed)?;
        self.check_dimension(&vectors)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
