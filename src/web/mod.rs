//! # Módulo Web — A API do Assistente
//!
//! Camada HTTP da aplicação, construída com **Axum**. A API é JSON-only:
//! o frontend (app Angular servido à parte) consome estes endpoints.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Frontend Angular (http://localhost:4200)                │
//! ├─────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                               │
//! │  ├── POST /api/chatbot/message → MessageResult JSON     │
//! │  └── GET  /api/chatbot/health  → liveness estático      │
//! ├─────────────────────────────────────────────────────────┤
//! │ CorsLayer (origem do dev server Angular)                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`handlers`] | Handlers Axum + conversão de erros em 500 JSON |

pub mod handlers;
pub mod state;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Origem permitida pelo CORS — o dev server do frontend Angular.
const CORS_ORIGIN: &str = "http://localhost:4200";

/// Cria o router Axum com todas as rotas da API.
///
/// O estado `AppState` é compartilhado entre os handlers via extrator
/// `State<AppState>` do Axum; o CORS libera só a origem do frontend,
/// métodos GET/POST e o header `content-type`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static(CORS_ORIGIN))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/chatbot/message", post(handlers::process_message))
        .route("/api/chatbot/health", get(handlers::health_check))
        .layer(cors)
        .with_state(state)
}
