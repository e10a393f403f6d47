//! # Matcher de Intents — Pré-processamento, Similaridade e Classificação
//!
//! O [`PatternMatcher`] determina o **intent** da mensagem do usuário
//! comparando-a semanticamente com os padrões do catálogo.
//!
//! ## Estratégia
//!
//! ```text
//! Inicialização (uma vez):
//!   Para cada intent, para cada padrão:
//!     lowercase + NFC → embed → PatternEmbedding (imutável)
//!
//! Por mensagem:
//!   lowercase + NFC → embed (1 forward pass)
//!     → cosseno contra TODOS os padrões pré-computados
//!     → melhor score com comparador estrito (>)
//! ```
//!
//! A varredura é um loop duplo linear na ordem do catálogo — sem índice,
//! sem poda. Para um catálogo pequeno e fixo isso é o desenho correto, e
//! a ordem da varredura é **observável**: no empate de scores, vence o
//! primeiro padrão (na ordem do catálogo) que atingiu o máximo, porque
//! `score > max` estrito nunca deixa um empate posterior sobrescrever.
//!
//! ## Custo
//!
//! - Inicialização: 1 forward pass em batch por intent
//! - Classificação: 1 forward pass + O(intents × padrões) comparações cosseno

use std::sync::Arc;

use anyhow::Result;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::Intent;
use crate::nlu::SemanticEncoder;

/// Nome de intent reservado para "nenhum padrão casou".
pub const UNKNOWN_INTENT: &str = "unknown";

/// Embedding pré-computado de um padrão, pareado com a frase de origem.
///
/// Derivado uma única vez dos padrões de um intent; nunca mutado.
struct PatternEmbedding {
    /// Frase de origem, já normalizada (NFC + lowercase).
    text: String,
    /// Embedding da frase (L2-normalizado pelo encoder).
    embedding: Vec<f32>,
}

/// Padrões pré-processados de um intent, na ordem do catálogo.
struct IntentPatterns {
    /// Nome do intent dono destes padrões.
    name: String,
    /// Embeddings dos padrões, na ordem em que aparecem no catálogo.
    patterns: Vec<PatternEmbedding>,
}

/// Resultado da classificação de uma mensagem.
///
/// Transiente — produzido a cada requisição, nunca compartilhado.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Nome do intent vencedor, ou [`UNKNOWN_INTENT`] se nenhum padrão
    /// pontuou acima de 0.
    pub intent: String,
    /// Score do melhor padrão, em [0, 1].
    pub confidence: f32,
}

/// Matcher de intents com padrões pré-embeddados.
///
/// ## Concorrência
///
/// Imutável após a criação (`&self` em todos os métodos) — seguro para
/// requisições concorrentes sem lock. O estado compartilhado se resume
/// aos embeddings pré-computados, somente leitura.
pub struct PatternMatcher {
    /// Encoder usado para embeddar cada mensagem recebida.
    encoder: Arc<dyn SemanticEncoder>,
    /// Padrões por intent, preservando a ordem do catálogo.
    intents: Vec<IntentPatterns>,
}

impl PatternMatcher {
    /// Pré-processa o catálogo: embedda todos os padrões de cada intent.
    ///
    /// Roda uma vez na inicialização. Qualquer falha do encoder aqui é
    /// fatal — o processo não pode servir sem os padrões pré-computados.
    ///
    /// # Erros
    ///
    /// Propaga a primeira falha de embedding do encoder.
    pub fn new(encoder: Arc<dyn SemanticEncoder>, catalog: &[Intent]) -> Result<Self> {
        let mut intents = Vec::with_capacity(catalog.len());
        for intent in catalog {
            // Uma forward pass em batch por intent — todos os padrões juntos
            let texts: Vec<String> = intent.patterns.iter().map(|p| normalize(p)).collect();
            let embeddings = encoder.encode_batch(&texts)?;
            let patterns = texts
                .into_iter()
                .zip(embeddings)
                .map(|(text, embedding)| PatternEmbedding { text, embedding })
                .collect();
            intents.push(IntentPatterns {
                name: intent.name.clone(),
                patterns,
            });
        }

        let total: usize = intents.iter().map(|i| i.patterns.len()).sum();
        tracing::info!(
            intents = intents.len(),
            patterns = total,
            "Padrões do catálogo pré-processados"
        );
        Ok(Self { encoder, intents })
    }

    /// Classifica o intent de uma mensagem.
    ///
    /// Embedda a mensagem uma única vez (sem cache entre requisições) e
    /// varre todos os padrões na ordem do catálogo, guardando o melhor
    /// score com comparador **estritamente maior**.
    ///
    /// Se nenhum padrão pontua acima de 0, retorna
    /// `(UNKNOWN_INTENT, 0.0)` — caminho normal, nunca um erro.
    ///
    /// # Erros
    ///
    /// Propaga falha de embedding do encoder (erro de requisição).
    pub fn detect(&self, text: &str) -> Result<Detection> {
        let embedding = self.encoder.encode(&normalize(text))?;

        let mut max_score = 0.0f32;
        let mut best_intent = UNKNOWN_INTENT;
        let mut best_pattern = "";

        for intent in &self.intents {
            for pattern in &intent.patterns {
                let score = score_against(&embedding, pattern);
                if score > max_score {
                    max_score = score;
                    best_intent = &intent.name;
                    best_pattern = &pattern.text;
                }
            }
        }

        tracing::debug!(
            intent = %best_intent,
            pattern = %best_pattern,
            confidence = max_score,
            "Intent detectado"
        );
        Ok(Detection {
            intent: best_intent.to_string(),
            confidence: max_score,
        })
    }
}

/// Score de similaridade entre a mensagem embeddada e um padrão, em [0, 1].
///
/// Cosseno simétrico e determinístico; valores negativos (possíveis em
/// tese mesmo com vetores normalizados) são truncados em 0 — abaixo de
/// zero não há informação de ranking que a varredura use.
fn score_against(embedding: &[f32], pattern: &PatternEmbedding) -> f32 {
    cosine_similarity(embedding, &pattern.embedding).clamp(0.0, 1.0)
}

/// Normaliza um texto para comparação: Unicode NFC + lowercase.
///
/// O NFC garante que acentos franceses ("é", "à") tenham representação
/// consistente entre catálogo e mensagem antes do lowercase e do
/// tokenizer.
fn normalize(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Similaridade de cosseno entre dois vetores.
///
/// ## Fórmula
///
/// ```text
/// cos(θ) = (A · B) / (‖A‖ × ‖B‖)
/// ```
///
/// ## Edge Cases
///
/// - Vetores de tamanhos diferentes → retorna 0.0
/// - Vetores vazios → retorna 0.0
/// - Vetor zero (norma 0) → retorna 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    // Vetores devem ter o mesmo tamanho e não ser vazios
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    // Calcula produto escalar e normas em uma única passada
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0 // Evita divisão por zero
    } else {
        dot / denom
    }
}
