//! # Handlers HTTP — Os Endpoints da API
//!
//! Cada função pública neste módulo é um handler Axum, mapeado a uma
//! rota em [`super::create_router()`].
//!
//! | Handler | Método | Retorno | Uso |
//! |---------|--------|---------|-----|
//! | `process_message` | POST | JSON [`MessageResult`] | Processa uma mensagem do usuário |
//! | `health_check` | GET | JSON estático | Probe de liveness |
//!
//! ## Erros
//!
//! Falhas do engine (embedding, sentimento) viram `500` com corpo JSON
//! `{"error": "..."}` — logadas em nível error no servidor, expostas ao
//! cliente só pela mensagem, nunca silenciosamente engolidas.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::context::UserContext;
use crate::orchestrator::MessageResult;

/// Corpo da requisição de chat.
#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    /// Texto livre do usuário.
    pub message: String,
    /// Contexto opcional de sessão fornecido pelo frontend.
    #[serde(default)]
    pub user_context: Option<UserContext>,
}

/// Resposta do probe de liveness — estática, independente do engine.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Sempre `"healthy"` enquanto o processo responde.
    pub status: &'static str,
}

/// Corpo de erro retornado em falhas do engine.
#[derive(Serialize)]
struct ErrorBody {
    /// Mensagem da falha, sem detalhes internos além dela.
    error: String,
}

/// Erro de requisição da API — converte em `500` com corpo JSON.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Falha ao processar mensagem");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// POST `/api/chatbot/message` — processa uma mensagem do usuário.
///
/// O forward pass dos modelos é CPU-bound, então o processamento roda em
/// `spawn_blocking` para não ocupar os workers async do runtime.
pub async fn process_message(
    State(state): State<AppState>,
    Json(payload): Json<ChatMessage>,
) -> Result<Json<MessageResult>, ApiError> {
    tracing::info!(message = %payload.message, "Mensagem recebida");

    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        engine.process(&payload.message, payload.user_context.as_ref())
    })
    .await
    .map_err(|e| ApiError(anyhow::anyhow!("inference task failed: {e}")))??;

    tracing::debug!(intent = %result.intent, "Resposta enviada");
    Ok(Json(result))
}

/// GET `/api/chatbot/health` — probe de liveness.
///
/// Estático por contrato: não toca no engine, responde enquanto o
/// processo estiver vivo.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
