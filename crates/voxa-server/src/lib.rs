//! Voxa server library logic.

pub mod agents;
pub mod api_ws;
pub mod background;
pub mod config;
pub mod persistence;
pub mod pipeline;
pub mod session;

use agents::AgentLoader;
use axum::{extract::Extension, routing::get, Json, Router};
use persistence::ConversationLog;
use pipeline::Pipeline;
use serde::Serialize;
use serde_json::{json, Value};
use session::SessionStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use voxa_db::DbPool;

/// Provider names reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Components {
    pub stt: String,
    pub llm: String,
    pub tts: String,
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Active voice sessions.
    pub sessions: SessionStore,
    /// Agent definition loader.
    pub agents: AgentLoader,
    /// STT, LLM and TTS wired together.
    pub pipeline: Pipeline,
    /// Conversation log.
    pub log: ConversationLog,
    pub components: Components,
}

/// Service description.
async fn root() -> Json<Value> {
    Json(json!({
        "service": "voxa",
        "version": env!("CARGO_PKG_VERSION"),
        "pipeline": "speech-to-text -> language model -> text-to-speech",
        "websocket": "/ws/{agent_name}"
    }))
}

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let database = state.log.ping().await;
    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "components": {
            "stt": state.components.stt,
            "llm": state.components.llm,
            "tts": state.components.tts,
            "database": if database { "sqlite" } else { "unavailable" }
        }
    }))
}

/// Lists active sessions.
async fn list_sessions(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let sessions = state.sessions.list().await;
    Json(json!({
        "count": sessions.len(),
        "sessions": sessions
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions))
        .route("/ws/{agent_name}", get(api_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
