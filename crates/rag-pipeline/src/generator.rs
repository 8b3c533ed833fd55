//! Answer generation through the Yandex Foundation Models completion API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rag_core::config::GeneratorConfig;
use rag_core::{AnswerResult, ChatMessage, GenerationRequest, RagError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Sends a system + user conversation to a completion service and returns
/// the first alternative.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<AnswerResult>;

    /// Target model, for status reporting.
    fn model(&self) -> &str;
}

/// How the client authenticates, detected from the token's prefix: IAM
/// tokens start with `t1.`, OAuth tokens with `y0_` to `y3_`, and anything
/// else is an API key.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    IamToken(String),
    /// Exchanged for a short-lived IAM token before use.
    OAuthToken(String),
    ApiKey(String),
}

impl Credential {
    pub fn from_token(token: &str) -> Self {
        if token.starts_with("t1.") {
            Self::IamToken(token.to_string())
        } else if matches!(token.get(..3), Some("y0_" | "y1_" | "y2_" | "y3_")) {
            Self::OAuthToken(token.to_string())
        } else {
            Self::ApiKey(token.to_string())
        }
    }

    /// Header value usable without an exchange. `None` for OAuth tokens.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Self::IamToken(t) => Some(format!("Bearer {t}")),
            Self::ApiKey(k) => Some(format!("Api-Key {k}")),
            Self::OAuthToken(_) => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IamToken(_) => write!(f, "IamToken(<redacted>)"),
            Self::OAuthToken(_) => write!(f, "OAuthToken(<redacted>)"),
            Self::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
        }
    }
}

/// IAM tokens are refreshed this many seconds before they expire.
const IAM_REFRESH_MARGIN_SECS: i64 = 300;
/// Lifetime assumed when the exchange omits `expiresAt`.
const IAM_DEFAULT_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IamTokenRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IamTokenResponse {
    iam_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

struct CachedIamToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

/// Resolves the `Authorization` header, exchanging an OAuth token for an
/// IAM token and caching it until shortly before expiry.
struct Authorizer {
    credential: Credential,
    iam_endpoint: String,
    cached: Mutex<Option<CachedIamToken>>,
}

impl Authorizer {
    fn new(credential: Credential) -> Self {
        Self {
            credential,
            iam_endpoint: GeneratorConfig::default().iam_endpoint,
            cached: Mutex::new(None),
        }
    }

    async fn header(&self, client: &Client) -> Result<String> {
        let oauth = match &self.credential {
            Credential::OAuthToken(t) => t,
            other => {
                return other
                    .authorization_header()
                    .ok_or_else(|| RagError::generator_unavailable("credential has no header"))
            }
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Utc::now() < t.refresh_at) {
            return Ok(format!("Bearer {}", token.token));
        }
        let fresh = self.exchange(client, oauth).await?;
        let header = format!("Bearer {}", fresh.token);
        *cached = Some(fresh);
        Ok(header)
    }

    async fn exchange(&self, client: &Client, oauth: &str) -> Result<CachedIamToken> {
        debug!(endpoint = %self.iam_endpoint, "exchanging OAuth token for IAM token");
        let response = client
            .post(&self.iam_endpoint)
            .json(&IamTokenRequest { yandex_passport_oauth_token: oauth })
            .send()
            .await
            .map_err(YandexGptClient::map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::generator_unavailable(format!(
                "IAM token exchange failed {status}: {body}"
            )));
        }
        let parsed: IamTokenResponse = response.json().await.map_err(|e| {
            RagError::generator_unavailable(format!("failed to parse IAM token response: {e}"))
        })?;

        let now = Utc::now();
        let refresh_at = parsed
            .expires_at
            .map(|at| at - TimeDelta::seconds(IAM_REFRESH_MARGIN_SECS))
            .unwrap_or(now + TimeDelta::seconds(IAM_DEFAULT_LIFETIME_SECS));
        info!(%refresh_at, "IAM token issued");
        Ok(CachedIamToken { token: parsed.iam_token, refresh_at })
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("credential", &self.credential)
            .field("iam_endpoint", &self.iam_endpoint)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    /// The API takes this as a decimal string.
    max_tokens: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug)]
pub struct YandexGptClient {
    endpoint: String,
    model_uri: String,
    folder_id: Option<String>,
    auth: Authorizer,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl YandexGptClient {
    pub fn new(
        endpoint: impl Into<String>,
        model_uri: impl Into<String>,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("completion HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            model_uri: model_uri.into(),
            folder_id: None,
            auth: Authorizer::new(credential),
            temperature: rag_core::config::DEFAULT_TEMPERATURE,
            max_tokens: 2000,
            client,
        })
    }

    /// Build from configuration. `Ok(None)` means no token was supplied and
    /// the generator is disabled. A token with no model to target is an error.
    pub fn from_config(cfg: &GeneratorConfig) -> Result<Option<Self>> {
        let Some(token) = cfg.token.as_deref() else {
            warn!("YANDEX_TOKEN not set; answer generation disabled");
            return Ok(None);
        };
        let model_uri = cfg.resolved_model_uri().ok_or_else(|| {
            RagError::Config("YANDEX_TOKEN is set but no folder or model URI is configured".into())
        })?;

        let mut client = Self::new(&cfg.endpoint, model_uri, Credential::from_token(token), cfg.timeout())?
            .with_iam_endpoint(&cfg.iam_endpoint);
        client.folder_id = cfg.folder_id.clone();
        client.temperature = cfg.temperature;
        client.max_tokens = cfg.max_tokens;
        info!(
            model_uri = %client.model_uri,
            credential = ?client.auth.credential,
            "completion service configured"
        );
        Ok(Some(client))
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_iam_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth.iam_endpoint = endpoint.into();
        self
    }

    fn map_send_error(err: reqwest::Error) -> RagError {
        if err.is_timeout() {
            RagError::generator_timeout(format!("completion request timed out: {err}"))
        } else {
            RagError::generator_unavailable(format!("completion request failed: {err}"))
        }
    }
}

#[async_trait]
impl AnswerGenerator for YandexGptClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<AnswerResult> {
        let body = CompletionRequest {
            model_uri: &self.model_uri,
            completion_options: CompletionOptions {
                stream: false,
                temperature: self.temperature,
                max_tokens: self.max_tokens.to_string(),
            },
            messages: request.messages(),
        };

        let authorization = self.auth.header(&self.client).await?;
        let mut http = self
            .client
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .json(&body);
        if let Some(folder) = &self.folder_id {
            http = http.header("x-folder-id", folder);
        }

        let response = http.send().await.map_err(Self::map_send_error)?;
        let status = response.status();
        let text = response.text().await.map_err(Self::map_send_error)?;
        if !status.is_success() {
            return Err(RagError::generator_unavailable(format!(
                "completion service error {status}: {text}"
            )));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text).map_err(|e| {
            RagError::generator_unavailable(format!("failed to parse completion response: {e}"))
        })?;

        let model_version = parsed.result.model_version;
        let Some(first) = parsed.result.alternatives.into_iter().next() else {
            debug!("completion returned no alternatives");
            return Ok(AnswerResult { text: String::new(), model_version });
        };
        debug!(status = ?first.status, chars = first.message.text.len(), "completion received");
        Ok(AnswerResult { text: first.message.text, model_version })
    }

    fn model(&self) -> &str {
        &self.model_uri
    }
}
