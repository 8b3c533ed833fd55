//! The immutable service context shared by every request handler.

use std::sync::Arc;
use std::time::Duration;

use rag_core::config::{EmbeddingConfig, RagConfig, RetrievalConfig};
use rag_core::{AnswerResult, GenerationRequest, QueryRequest, RagError, Result, RetrievalResult};
use rag_vectordb::IndexStore;
use tracing::{info, instrument};

use crate::embedder::{Embedder, HttpEmbedder};
use crate::onnx::OnnxEmbedder;
use crate::generator::{AnswerGenerator, YandexGptClient};
use crate::prompt::PromptAssembler;
use crate::retriever::Retriever;

/// Everything a request needs, built once at startup and never mutated.
#[derive(Clone)]
pub struct RagService {
    retriever: Retriever,
    embedder: Arc<dyn Embedder>,
    assembler: PromptAssembler,
    generator: Option<Arc<dyn AnswerGenerator>>,
    generator_timeout: Duration,
    default_top_k: usize,
}

/// A local model directory takes precedence over the HTTP endpoint.
pub async fn connect_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(match &cfg.model_dir {
        Some(_) => Arc::new(OnnxEmbedder::load(cfg).await?),
        None => Arc::new(HttpEmbedder::connect(cfg).await?),
    })
}

/// Outcome of a full ask: the answer plus what it was grounded on.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: AnswerResult,
    pub retrieval: RetrievalResult,
    pub prompt: GenerationRequest,
}

impl RagService {
    /// Assemble a service from already-initialized parts. The embedder must
    /// produce vectors of the index's dimension.
    pub fn new(
        store: Arc<IndexStore>,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn AnswerGenerator>>,
        retrieval: &RetrievalConfig,
        generator_timeout: Duration,
    ) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(RagError::EmbeddingUnavailable(format!(
                "model {} produces {} dimensions but the index holds {}",
                embedder.model_name(),
                embedder.dimension(),
                store.dimension()
            )));
        }
        Ok(Self {
            retriever: Retriever::new(store, Arc::clone(&embedder)),
            embedder,
            assembler: PromptAssembler::new().with_max_context_chars(retrieval.max_context_chars),
            generator,
            generator_timeout,
            default_top_k: retrieval.default_top_k,
        })
    }

    /// Startup sequence: index store, then embedding model, then the
    /// optional completion client. Any error here is fatal to the process.
    pub async fn initialize(cfg: &RagConfig) -> Result<Self> {
        let store = IndexStore::load_from_config(&cfg.store).await?;
        let embedder = connect_embedder(&cfg.embedding).await?;
        let generator = YandexGptClient::from_config(&cfg.generator)?
            .map(|g| Arc::new(g) as Arc<dyn AnswerGenerator>);

        let service = Self::new(
            Arc::new(store),
            embedder,
            generator,
            &cfg.retrieval,
            cfg.generator.timeout(),
        )?;
        info!(
            vectors = service.store().len(),
            generator = service.generator_configured(),
            "service context ready"
        );
        Ok(service)
    }

    pub fn store(&self) -> &IndexStore {
        self.retriever.store()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    pub fn generator_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub fn generator_model(&self) -> Option<&str> {
        self.generator.as_deref().map(|g| g.model())
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub async fn retrieve(&self, question: &str, k: i64) -> Result<RetrievalResult> {
        self.retriever.retrieve(question, k).await
    }

    pub fn assemble(&self, question: &str, result: &RetrievalResult) -> GenerationRequest {
        self.assembler.assemble(question, result)
    }

    /// Run the completion call under the configured timeout.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<AnswerResult> {
        let generator = self.generator.as_ref().ok_or(RagError::GeneratorUnconfigured)?;
        match tokio::time::timeout(self.generator_timeout, generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::generator_timeout(format!(
                "no answer within {:?}",
                self.generator_timeout
            ))),
        }
    }

    /// Retrieve, assemble and generate for one request.
    #[instrument(skip(self, request), fields(question_len = request.question.len(), top_k = ?request.top_k))]
    pub async fn ask(&self, request: &QueryRequest) -> Result<AskOutcome> {
        request.validate()?;
        let k = request.top_k_or(self.default_top_k);
        if self.generator.is_none() {
            // Input errors take precedence over a missing generator.
            rag_core::types::validate_top_k(k)?;
            return Err(RagError::GeneratorUnconfigured);
        }

        let retrieval = self.retrieve(&request.question, k).await?;
        let prompt = self.assemble(&request.question, &retrieval);
        let answer = self.generate(&prompt).await?;
        Ok(AskOutcome { answer, retrieval, prompt })
    }
}
