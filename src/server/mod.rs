//! HTTP transport - chat endpoint, tool manifest, session reset, health

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::{ChatError, Result};
use crate::llm::LlmClient;
use crate::runner::TurnRunner;

const MESSAGE_REQUIRED: &str = "Message is required.";

/// Shared state for all handlers
pub struct AppState<L: LlmClient> {
    runner: Arc<TurnRunner<L>>,
    default_session_id: Arc<str>,
}

impl<L: LlmClient> AppState<L> {
    pub fn new(runner: Arc<TurnRunner<L>>, default_session_id: impl Into<String>) -> Self {
        Self {
            runner,
            default_session_id: Arc::from(default_session_id.into()),
        }
    }
}

impl<L: LlmClient> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            runner: self.runner.clone(),
            default_session_id: self.default_session_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub sessions: usize,
}

/// Error body returned to the widget: `{ "error": "..." }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            ChatError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: format!("Failed to get response from AI: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the application router
pub fn router<L: LlmClient + 'static>(state: AppState<L>) -> Router {
    Router::new()
        .route("/api/chat", post(chat::<L>))
        .route("/api/tools", get(tools::<L>))
        .route("/api/sessions/{id}", delete(reset_session::<L>))
        .route("/health", get(health::<L>))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

async fn chat<L: LlmClient + 'static>(
    State(state): State<AppState<L>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        log::warn!("Rejected chat request: {}", rejection.body_text());
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let message = request.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(ApiError::bad_request(MESSAGE_REQUIRED));
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.default_session_id.to_string());

    let reply = state.runner.run_turn(&session_id, &message).await?;
    Ok(Json(ChatResponse { response: reply.text }))
}

async fn tools<L: LlmClient + 'static>(State(state): State<AppState<L>>) -> impl IntoResponse {
    Json(state.runner.declarations().to_vec())
}

async fn reset_session<L: LlmClient + 'static>(
    State(state): State<AppState<L>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.runner.sessions().remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn health<L: LlmClient + 'static>(State(state): State<AppState<L>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.runner.model().to_string(),
        sessions: state.runner.sessions().len().await,
    })
}
