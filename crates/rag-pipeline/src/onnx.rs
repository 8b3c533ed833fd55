//! In-process sentence embeddings from a local ONNX export of a
//! sentence-transformers model such as all-MiniLM-L6-v2.
//!
//! The model directory holds `model.onnx` (or `onnx/model.onnx`) next to the
//! Hugging Face `tokenizer.json`. Embeddings are mean-pooled over the
//! attention mask and L2-normalized.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::{Array, ArrayViewD, Axis, CowArray, IxDyn};
use rag_core::config::EmbeddingConfig;
use rag_core::{RagError, Result};
use rag_vectordb::distance::normalize_vector;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embedder::Embedder;

const PROBE_TEXT: &str = "embedding model warm-up";
const MODEL_FILES: [&str; 2] = ["model.onnx", "onnx/model.onnx"];
const TOKENIZER_FILE: &str = "tokenizer.json";
const INTRA_THREADS: i16 = 4;

/// Graph inputs a BERT-style encoder may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelInput {
    InputIds,
    AttentionMask,
    TokenTypeIds,
}

impl ModelInput {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "input_ids" => Some(Self::InputIds),
            "attention_mask" => Some(Self::AttentionMask),
            "token_type_ids" => Some(Self::TokenTypeIds),
            _ => None,
        }
    }
}

struct OnnxModel {
    session: ort::Session,
    tokenizer: Tokenizer,
    inputs: Vec<ModelInput>,
    // Keeps the runtime alive for the session.
    _environment: Arc<ort::Environment>,
}

impl OnnxModel {
    fn load(model_path: &Path, tokenizer_path: &Path, max_tokens: usize) -> Result<Self> {
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            RagError::EmbeddingUnavailable(format!("{what}: {e}"))
        };

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| unavailable(&format!("tokenizer {}", tokenizer_path.display()), &e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_tokens, ..Default::default() }))
            .map_err(|e| unavailable("tokenizer truncation", &e))?;
        tokenizer.with_padding(None);

        let environment = ort::Environment::builder()
            .with_name("rag_embedder")
            .with_log_level(ort::LoggingLevel::Warning)
            .build()
            .map_err(|e| unavailable("ONNX runtime", &e))?
            .into_arc();
        let session = ort::SessionBuilder::new(&environment)
            .and_then(|b| b.with_optimization_level(ort::GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(INTRA_THREADS))
            .and_then(|b| b.with_model_from_file(model_path))
            .map_err(|e| unavailable(&format!("model {}", model_path.display()), &e))?;

        let inputs = session
            .inputs
            .iter()
            .map(|input| {
                ModelInput::from_name(&input.name).ok_or_else(|| {
                    RagError::EmbeddingUnavailable(format!("unsupported model input {:?}", input.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if !inputs.contains(&ModelInput::InputIds) {
            return Err(RagError::EmbeddingUnavailable("model has no input_ids input".into()));
        }

        Ok(Self { session, tokenizer, inputs, _environment: environment })
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let failed = |what: &str, e: &dyn std::fmt::Display| {
            RagError::EmbeddingFailed(format!("{what}: {e}"))
        };

        let encoding = self.tokenizer.encode(text, true).map_err(|e| failed("tokenize", &e))?;
        let mask = encoding.get_attention_mask();
        let seq_len = encoding.get_ids().len();

        let arrays = self
            .inputs
            .iter()
            .map(|input| {
                let values = match input {
                    ModelInput::InputIds => encoding.get_ids(),
                    ModelInput::AttentionMask => mask,
                    ModelInput::TokenTypeIds => encoding.get_type_ids(),
                };
                let values: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
                Array::from_shape_vec(IxDyn(&[1, seq_len]), values)
                    .map(CowArray::from)
                    .map_err(|e| failed("input tensor", &e))
            })
            .collect::<Result<Vec<CowArray<i64, IxDyn>>>>()?;

        let allocator = self.session.allocator();
        let values = arrays
            .iter()
            .map(|array| ort::Value::from_array(allocator, array).map_err(|e| failed("input value", &e)))
            .collect::<Result<Vec<_>>>()?;

        let outputs = self.session.run(values).map_err(|e| failed("inference", &e))?;
        let output = outputs
            .first()
            .ok_or_else(|| RagError::EmbeddingFailed("model produced no output".into()))?;
        let tensor = output.try_extract::<f32>().map_err(|e| failed("output tensor", &e))?;

        let mut embedding = masked_mean(&tensor.view(), mask)?;
        normalize_vector(&mut embedding);
        Ok(embedding)
    }
}

/// Pool a `[1, seq, hidden]` token matrix over positions whose mask is set.
/// A `[1, hidden]` output is already pooled and passes through.
fn masked_mean(hidden: &ArrayViewD<'_, f32>, mask: &[u32]) -> Result<Vec<f32>> {
    match hidden.ndim() {
        3 => {
            let tokens = hidden.index_axis(Axis(0), 0);
            let dim = tokens.shape()[1];
            let mut sum = vec![0.0f32; dim];
            let mut count = 0usize;
            for (row, _) in tokens.outer_iter().zip(mask).filter(|(_, m)| **m != 0) {
                for (acc, x) in sum.iter_mut().zip(row.iter()) {
                    *acc += x;
                }
                count += 1;
            }
            if count == 0 {
                return Err(RagError::EmbeddingFailed("input has no attended tokens".into()));
            }
            Ok(sum.into_iter().map(|x| x / count as f32).collect())
        }
        2 => Ok(hidden.index_axis(Axis(0), 0).iter().copied().collect()),
        _ => Err(RagError::EmbeddingFailed(format!(
            "unexpected output shape {:?}",
            hidden.shape()
        ))),
    }
}

fn locate_model(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let model = MODEL_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            RagError::EmbeddingUnavailable(format!("no model.onnx under {}", dir.display()))
        })?;
    let tokenizer = dir.join(TOKENIZER_FILE);
    if !tokenizer.is_file() {
        return Err(RagError::EmbeddingUnavailable(format!(
            "no {TOKENIZER_FILE} under {}",
            dir.display()
        )));
    }
    Ok((model, tokenizer))
}

/// Embedding model running inside the process. Built with
/// [`OnnxEmbedder::load`], which runs one warm-up inference.
pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
    name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl OnnxEmbedder {
    /// Load eagerly from `cfg.model_dir`. Any failure, including a missing
    /// runtime library, is `EmbeddingUnavailable`.
    pub async fn load(cfg: &EmbeddingConfig) -> Result<Self> {
        let dir = cfg
            .model_dir
            .clone()
            .ok_or_else(|| RagError::EmbeddingUnavailable("EMBEDDING_MODEL_DIR not set".into()))?;
        let (model_path, tokenizer_path) = locate_model(&dir)?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cfg.model.clone());
        let max_tokens = cfg.max_tokens;

        info!(model = %model_path.display(), "loading local embedding model");
        let (model, dimension) = tokio::task::spawn_blocking(move || {
            let model = OnnxModel::load(&model_path, &tokenizer_path, max_tokens)?;
            let probe = model.embed(PROBE_TEXT).map_err(|e| {
                RagError::EmbeddingUnavailable(format!("warm-up inference failed: {e}"))
            })?;
            Ok::<_, RagError>((model, probe.len()))
        })
        .await
        .map_err(|e| RagError::EmbeddingUnavailable(format!("model loader aborted: {e}")))??;

        if dimension == 0 {
            return Err(RagError::EmbeddingUnavailable(format!("{name} produced an empty embedding")));
        }
        info!(model = %name, dimension, "embedding model ready");
        Ok(Self { model: Arc::new(model), name, dimension })
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        debug!(chars = text.len(), "embedding text locally");
        tokio::task::spawn_blocking(move || model.embed(&text))
            .await
            .map_err(|e| RagError::EmbeddingFailed(format!("inference task aborted: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
