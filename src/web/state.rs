//! # Estado da Aplicação Web
//!
//! Estado compartilhado entre todos os handlers Axum. Diferente de um
//! serviço com modelo carregado em background, aqui o engine é construído
//! **antes** do bind — falha de backend de inferência é fatal na
//! inicialização, então os handlers nunca veem um engine pela metade.

use std::sync::Arc;

use crate::orchestrator::Chatbot;

/// Estado compartilhado da aplicação Axum.
///
/// `Clone` barato: só incrementa o contador do `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Engine do assistente, imutável e pronto desde a inicialização.
    pub engine: Arc<Chatbot>,
}
