use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use rag_core::QueryRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, Phase};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub vectorstore_loaded: bool,
    pub model_loaded: bool,
    pub yandex_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: Phase,
    pub started_at: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_model: Option<String>,
    pub default_top_k: Option<usize>,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
}

pub fn ask_routes() -> Router<AppState> {
    Router::new().route("/ask", post(ask))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "RAG service running" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = state.service().ok();
    Json(HealthResponse {
        vectorstore_loaded: service.is_some(),
        model_loaded: service.is_some(),
        yandex_configured: service.map(|s| s.generator_configured()).unwrap_or(false),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let service = state.service().ok();
    let service = service.as_deref();
    Json(StatusResponse {
        phase: state.phase(),
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: state.uptime_secs(),
        vectors: service.map(|s| s.store().len()),
        dimension: service.map(|s| s.store().dimension()),
        metric: service.map(|s| s.store().metric().to_string()),
        embedding_model: service.map(|s| s.embedder().model_name().to_string()),
        generator_model: service.and_then(|s| s.generator_model().map(str::to_string)),
        default_top_k: service.map(|s| s.default_top_k()),
    })
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload?;
    let service = state.service()?;
    let outcome = service.ask(&request).await?;
    info!(
        retrieved = outcome.retrieval.len(),
        answer_chars = outcome.answer.text.len(),
        "answered"
    );
    Ok(Json(AskResponse { answer: outcome.answer.text }))
}
