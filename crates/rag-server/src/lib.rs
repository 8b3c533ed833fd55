//! RAG HTTP API server (Axum).
//!
//! Exposes liveness, health and status endpoints and `POST /ask`, which runs
//! retrieval, prompt assembly and answer generation for one question.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;
use tower_http::trace::TraceLayer;

/// Build the application router with a fresh, not-yet-loaded state.
pub fn app() -> Router {
    app_with_state(AppState::new())
}

/// Build the application router with a custom state.
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::ask_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
