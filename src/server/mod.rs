// HTTP server module
// Thin axum surface over the advisor pipeline: /chat, /health, /reset


use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, serve};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::advisor::{Advisor, SourceRef};
use crate::config::Config;
use crate::database::sqlite::Database;
use crate::database::lancedb::vector_store::VectorStore;
use crate::embeddings::OllamaClient;
use crate::generation::{ChatClient, TokenUsage};
use crate::retrieval::Retriever;

const SESSION_DEFAULT: &str = "default";

pub struct AppState {
    pub advisor: Advisor,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub tokens: TokenUsage,
    pub using_rag: bool,
    pub using_memory: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rag_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// 500 payload: well-formed, user-safe, never a stack trace.
#[derive(Debug, Serialize)]
struct FailureResponse {
    error: &'static str,
    answer: &'static str,
    sources: Vec<SourceRef>,
    tokens: TokenUsage,
    using_rag: bool,
    timestamp: String,
}

/// Build the application router around shared advisor state.
#[inline]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/reset", post(reset))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Assemble the pipeline from config and serve until shutdown.
#[inline]
pub async fn run_server(config: Config) -> Result<()> {
    let database = Arc::new(
        Database::initialize(&config)
            .await
            .context("Failed to initialize metadata database")?,
    );

    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?,
    );

    let embedder = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?,
    );
    let generator =
        Arc::new(ChatClient::new(&config.ollama).context("Failed to initialize chat client")?);

    if let Err(e) = embedder.ping() {
        warn!("Ollama is not reachable yet, requests will degrade: {:#}", e);
    }

    let retriever = Retriever::new(embedder, store);
    let advisor = Advisor::new(retriever, generator, database, &config.retrieval);
    let state = Arc::new(AppState { advisor });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address: {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Advisor server listening on {}", addr);

    serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let message = match request.message.as_deref().map(str::trim) {
        None => return bad_request("No message provided"),
        Some("") => return bad_request("Empty message"),
        Some(message) => message.to_string(),
    };

    let session_id = request
        .session_id
        .unwrap_or_else(|| SESSION_DEFAULT.to_string());

    match state.advisor.answer(&session_id, &message).await {
        Ok(outcome) => {
            info!(
                "Answered chat message ({} chars) via {:?}",
                message.len(),
                outcome.source
            );
            let body = ChatResponse {
                using_rag: outcome.using_rag(),
                answer: outcome.answer,
                sources: outcome.sources,
                tokens: outcome.tokens,
                using_memory: outcome.using_memory,
                timestamp: Utc::now().to_rfc3339(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!("Unhandled error in chat endpoint: {}", e);
            let body = FailureResponse {
                error: "Internal server error",
                answer: "I'm sorry, I'm experiencing technical difficulties. \
                         Please try again later.",
                sources: Vec::new(),
                tokens: TokenUsage::default(),
                using_rag: false,
                timestamp: Utc::now().to_rfc3339(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let degraded_reason = state.advisor.health().degraded_reason();
    let body = HealthResponse {
        status: "healthy",
        rag_available: degraded_reason.is_none(),
        degraded_reason,
        timestamp: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(body)).into_response()
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetRequest>,
) -> Response {
    match request.session_id {
        Some(session_id) => {
            state.advisor.sessions().clear(&session_id);
            info!("Reset conversation for session '{}'", session_id);
        }
        None => {
            state.advisor.sessions().clear_all();
            info!("Reset all conversations");
        }
    }

    let body = ResetResponse {
        status: "conversation_reset",
        timestamp: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
