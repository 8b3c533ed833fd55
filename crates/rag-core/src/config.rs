use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::types::DEFAULT_TOP_K;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub generator: GeneratorConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where the two index artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreLocation {
    Dir(PathBuf),
    Url(String),
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dir(p) => write!(f, "{}", p.display()),
            Self::Url(u) => write!(f, "{u}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub index_file: String,
    pub metadata_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Local ONNX model directory (`model.onnx` + `tokenizer.json`). When
    /// set, the model runs in-process and `endpoint` is ignored.
    pub model_dir: Option<PathBuf>,
    /// Token budget per input for the local model.
    pub max_tokens: usize,
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub folder_id: Option<String>,
    pub model: String,
    pub model_version: String,
    /// Overrides the `gpt://<folder>/<model>/<version>` URI built from the fields above.
    pub model_uri: Option<String>,
    pub endpoint: String,
    /// IAM exchange for OAuth tokens.
    pub iam_endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    /// Budget for the assembled context block. `None` sends every snippet.
    pub max_context_chars: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: DEFAULT_PORT }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::Dir(PathBuf::from("/app/vectorstore")),
            index_file: "vectorstore.index".into(),
            metadata_file: "vectorstore_meta.json".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            max_tokens: 256,
            endpoint: "http://127.0.0.1:8081/v1/embeddings".into(),
            model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            token: None,
            folder_id: None,
            model: "yandexgpt-32k".into(),
            model_version: "latest".into(),
            model_uri: None,
            endpoint: "https://llm.api.cloud.yandex.net/foundationModels/v1/completion".into(),
            iam_endpoint: "https://iam.api.cloud.yandex.net/iam/v1/tokens".into(),
            timeout_secs: 60,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: 2000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_top_k: DEFAULT_TOP_K, max_context_chars: None }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("folder_id", &self.folder_id)
            .field("model", &self.model)
            .field("model_version", &self.model_version)
            .field("model_uri", &self.model_uri)
            .field("endpoint", &self.endpoint)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolved_model_uri(&self) -> Option<String> {
        if let Some(uri) = &self.model_uri {
            return Some(uri.clone());
        }
        self.folder_id
            .as_ref()
            .map(|folder| format!("gpt://{folder}/{}/{}", self.model, self.model_version))
    }

    /// A credential and a target model are both known.
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.resolved_model_uri().is_some()
    }

    /// A token without a folder or model URI cannot reach any model.
    pub fn check_target(&self) -> Result<()> {
        if self.token.is_some() && self.resolved_model_uri().is_none() {
            return Err(RagError::Config(
                "YANDEX_TOKEN is set but neither YANDEX_FOLDER_ID nor YANDEX_MODEL_URI names a model"
                    .into(),
            ));
        }
        Ok(())
    }
}

impl RagConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(host) = get("HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = get("PORT") {
            cfg.server.port = parse("PORT", &port)?;
        }

        if let Some(url) = get("VECTORSTORE_URL") {
            cfg.store.location = StoreLocation::Url(url);
        } else if let Some(dir) = get("VECTORSTORE_DIR") {
            cfg.store.location = StoreLocation::Dir(PathBuf::from(dir));
        }
        if let Some(name) = get("VECTORSTORE_INDEX_FILE") {
            cfg.store.index_file = name;
        }
        if let Some(name) = get("VECTORSTORE_META_FILE") {
            cfg.store.metadata_file = name;
        }

        cfg.embedding.model_dir = get("EMBEDDING_MODEL_DIR").map(PathBuf::from);
        if let Some(tokens) = get("EMBEDDING_MAX_TOKENS") {
            cfg.embedding.max_tokens = parse("EMBEDDING_MAX_TOKENS", &tokens)?;
        }
        if let Some(endpoint) = get("EMBEDDING_URL") {
            cfg.embedding.endpoint = endpoint;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            cfg.embedding.model = model;
        }
        cfg.embedding.api_key = get("EMBEDDING_API_KEY");
        if let Some(secs) = get("EMBEDDING_TIMEOUT_SECS") {
            cfg.embedding.timeout_secs = parse("EMBEDDING_TIMEOUT_SECS", &secs)?;
        }

        cfg.generator.token = get("YANDEX_TOKEN");
        cfg.generator.folder_id = get("YANDEX_FOLDER_ID");
        cfg.generator.model_uri = get("YANDEX_MODEL_URI");
        if let Some(model) = get("YANDEX_MODEL") {
            cfg.generator.model = model;
        }
        if let Some(version) = get("YANDEX_MODEL_VERSION") {
            cfg.generator.model_version = version;
        }
        if let Some(endpoint) = get("YANDEX_COMPLETION_URL") {
            cfg.generator.endpoint = endpoint;
        }
        if let Some(secs) = get("YANDEX_TIMEOUT_SECS") {
            cfg.generator.timeout_secs = parse("YANDEX_TIMEOUT_SECS", &secs)?;
        }
        if let Some(url) = get("YANDEX_IAM_URL") {
            cfg.generator.iam_endpoint = url;
        }
        cfg.generator.check_target()?;

        if let Some(k) = get("RAG_TOP_K") {
            let k: usize = parse("RAG_TOP_K", &k)?;
            if k == 0 {
                return Err(RagError::Config("RAG_TOP_K must be positive".into()));
            }
            cfg.retrieval.default_top_k = k;
        }
        if let Some(chars) = get("RAG_MAX_CONTEXT_CHARS") {
            cfg.retrieval.max_context_chars = Some(parse("RAG_MAX_CONTEXT_CHARS", &chars)?);
        }

        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| RagError::Config(format!("{key}={value:?}: {e}")))
}
