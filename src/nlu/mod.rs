//! # NLU — Backends de Inferência do Assistente
//!
//! Este módulo reúne os dois backends de ML que o engine consome, cada um
//! atrás de um trait:
//!
//! | Capacidade | Trait | Implementação de produção |
//! |------------|-------|---------------------------|
//! | `embed(texto) → vetor` | [`SemanticEncoder`] | [`embedder::Embedder`] (BERT francês via candle) |
//! | `classify(texto) → rótulo` | [`SentimentAnalyzer`] | [`sentiment::SentimentClassifier`] (BERT multilíngue de sentimento) |
//!
//! Os traits existem porque o engine não depende de *como* os vetores e
//! rótulos são produzidos — só dos contratos. Em produção os dois são
//! modelos candle carregados do HuggingFace Hub; nos testes são stubs
//! determinísticos (ver `testutil`).
//!
//! ## Concorrência
//!
//! Ambos os traits exigem `Send + Sync`: as implementações candle fazem
//! forward pass com `&self` sobre pesos imutáveis, então chamadas
//! concorrentes são seguras sem lock externo.

/// Sub-módulo do embedder BERT francês via candle.
pub mod embedder;

/// Sub-módulo do classificador de sentimento BERT multilíngue.
pub mod sentiment;

use anyhow::Result;

/// Capacidade de embedding: texto → representação vetorial comparável.
///
/// O contrato exigido pelo matcher:
/// - Determinístico: o mesmo texto sempre produz o mesmo vetor.
/// - Vetores comparáveis por similaridade de cosseno (idealmente
///   L2-normalizados, de modo que cosseno = produto escalar).
///
/// # Erros
///
/// Falha de tokenização ou de inferência — propagada como erro de
/// requisição (ou de inicialização, durante o pré-processamento).
pub trait SemanticEncoder: Send + Sync {
    /// Gera a representação vetorial de um texto.
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Gera representações para vários textos de uma vez.
    ///
    /// A implementação padrão chama [`encode`](Self::encode) texto a
    /// texto; backends com forward pass em batch (o embedder candle)
    /// sobrescrevem para fazer tudo em uma passada. Usado no
    /// pré-processamento do catálogo.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

/// Capacidade de análise de sentimento: texto → rótulo de classificação.
///
/// O rótulo é uma string opaca para o engine (ex.: `"4 stars"` no modelo
/// nlptown) — nenhuma relação com intents. Invocado exatamente uma vez
/// por mensagem, independente da confiança do intent.
pub trait SentimentAnalyzer: Send + Sync {
    /// Classifica o sentimento de um texto.
    fn classify(&self, text: &str) -> Result<String>;
}
