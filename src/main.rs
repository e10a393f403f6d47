#![allow(dead_code)]
#![allow(rustdoc::broken_intra_doc_links, rustdoc::invalid_html_tags)]
//! # AmenBank Chatbot — Assistente Bancário de Turno Único
//!
//! **Ponto de entrada principal** do assistente virtual da AmenBank.
//!
//! Dado um texto livre do usuário, o sistema identifica o intent mais
//! próximo de um catálogo fechado (FAQs bancárias em francês), sorteia
//! uma resposta pronta, rotula o sentimento da mensagem e, opcionalmente,
//! enriquece a resposta com o contexto de sessão do chamador.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── Carrega catálogo de intents (intents.json, ou padrão embutido)
//!   ├── spawn_blocking:
//!   │   ├── Carrega embedder BERT francês (HuggingFace Hub)
//!   │   ├── Carrega modelo de sentimento multilíngue
//!   │   └── Pré-processa os padrões do catálogo (Chatbot::new)
//!   ├── (qualquer falha acima → processo encerra SEM servir)
//!   ├── Bind na porta 8000
//!   └── axum::serve
//! ```
//!
//! Diferente de servidores que sobem antes do modelo carregar, aqui a
//! inicialização é tudo-ou-nada: sem backend de embedding ou de
//! sentimento não existe meia-operação útil, então o bind só acontece
//! com o engine completo.
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Executar com logs padrão (info)
//! cargo run
//!
//! # Executar com logs detalhados
//! RUST_LOG=debug cargo run
//!
//! # A API estará disponível em http://localhost:8000
//! curl -X POST http://localhost:8000/api/chatbot/message \
//!   -H 'content-type: application/json' \
//!   -d '{"message": "bonjour"}'
//! ```

// Declaração dos módulos da aplicação.
// Cada módulo corresponde a uma camada da arquitetura:

/// Módulo `catalog` — catálogo de intents: carregamento + seed padrão.
mod catalog;

/// Módulo `context` — contexto de sessão fornecido pelo chamador.
mod context;

/// Módulo `matcher` — pré-processamento de padrões e classificação.
mod matcher;

/// Módulo `nlu` — backends de inferência (embeddings + sentimento).
mod nlu;

/// Módulo `orchestrator` — o engine: fluxo completo de cada mensagem.
mod orchestrator;

/// Módulo `responder` — seleção de resposta e aumento por contexto.
mod responder;

/// Módulo `web` — servidor axum, handlers HTTP e CORS.
mod web;

/// Backends determinísticos usados apenas nos testes.
#[cfg(test)]
mod testutil;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::nlu::embedder::Embedder;
use crate::nlu::sentiment::SentimentClassifier;
use crate::orchestrator::Chatbot;
use crate::web::state::AppState;

/// Endereço de bind da API.
const BIND_ADDR: &str = "0.0.0.0:8000";

/// Função principal do assistente.
///
/// Inicializa tudo-ou-nada: catálogo, embedder, modelo de sentimento e
/// matcher precisam estar prontos antes do bind — falha em qualquer um
/// encerra o processo sem começar a servir.
///
/// # Erros
///
/// Retorna erro se:
/// - O catálogo existir mas estiver malformado
/// - Algum modelo não puder ser carregado do HuggingFace Hub
/// - Não conseguir fazer bind na porta 8000
#[tokio::main]
async fn main() -> Result<()> {
    // Configura o sistema de logging/tracing.
    // Aceita a variável de ambiente RUST_LOG para configurar o nível.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🏦 AmenBank Chatbot — Starting...");

    // Catálogo: ausente → padrão embutido; malformado → erro fatal.
    let intents = catalog::load_catalog(Path::new(catalog::CATALOG_PATH))
        .context("Failed to load intent catalog")?;

    // Carrega os dois modelos e pré-processa o catálogo em uma thread de
    // blocking — o carregamento é CPU/IO-intensivo e bloquearia o runtime
    // tokio se fosse feito inline.
    let engine = tokio::task::spawn_blocking(move || -> Result<Chatbot> {
        let embedder = Arc::new(Embedder::load().context("Failed to load embedding model")?);
        let sentiment = Arc::new(
            SentimentClassifier::load().context("Failed to load sentiment model")?,
        );
        Chatbot::new(intents, embedder, sentiment)
    })
    .await
    .context("Model loading task panicked")??;
    tracing::info!("✅ Engine ready!");

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR).await?;
    tracing::info!("🚀 Chatbot API running at http://{}", BIND_ADDR);

    // Inicia o servidor axum — bloqueia até o processo ser encerrado.
    axum::serve(listener, app).await?;

    Ok(())
}
