//! # Orquestrador — O Fluxo de Cada Mensagem
//!
//! O [`Chatbot`] é o ponto de entrada público do engine: recebe o texto
//! bruto do usuário e o contexto opcional de sessão, e devolve o
//! [`MessageResult`] completo.
//!
//! ## Fluxo de Processamento
//!
//! ```text
//! Mensagem do usuário
//!   ├── 1. PatternMatcher.detect()      → (intent, confiança)
//!   ├── 2. SentimentAnalyzer.classify() → rótulo de sentimento
//!   │      (independente do intent — sem dependência de dados entre 1 e 2)
//!   ├── 3. ResponseSelector.select()    → (resposta, action)
//!   ├── 4. augment()                    → resposta enriquecida pelo contexto
//!   └── 5. MessageResult montado
//! ```
//!
//! Sem retries e sem resultados parciais: qualquer falha de embedding ou
//! de sentimento sobe como erro da requisição — a camada web converte em
//! 5xx. Baixa confiança **não** é falha: é o caminho definido do intent
//! `"unknown"` com a resposta de fallback.
//!
//! ## Concorrência
//!
//! O engine é stateless por chamada: catálogo e embeddings pré-computados
//! são imutáveis após a inicialização, e os backends candle fazem forward
//! pass com `&self`. `process(&self, ...)` pode ser invocado de várias
//! tasks ao mesmo tempo; a única mutabilidade interior é o RNG do
//! seletor, serializado por mutex.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::catalog::Intent;
use crate::context::UserContext;
use crate::matcher::{PatternMatcher, UNKNOWN_INTENT};
use crate::nlu::{SemanticEncoder, SentimentAnalyzer};
use crate::responder::{augment, ResponseSelector, CONFIDENCE_THRESHOLD};

/// Resultado final do processamento de uma mensagem.
///
/// Invariante: `action` só é `Some` quando a confiança passou do corte
/// **e** o intent vencedor define uma action.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResult {
    /// Resposta do assistente, pronta para exibição.
    pub response: String,
    /// Intent reportado — `"unknown"` quando nada passou do corte.
    pub intent: String,
    /// Score do melhor padrão, em [0, 1].
    pub confidence: f32,
    /// Tag opaca do intent vencedor, consumida pelo frontend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Rótulo de sentimento da mensagem (ex.: `"4 stars"`).
    pub sentiment: String,
}

/// O engine do assistente — detecção de intent + seleção de resposta.
///
/// Construído uma vez na inicialização (o que pré-processa o catálogo) e
/// compartilhado via `Arc` entre os handlers.
pub struct Chatbot {
    /// Catálogo imutável de intents, na ordem de carregamento.
    catalog: Vec<Intent>,
    /// Matcher com padrões pré-embeddados.
    matcher: PatternMatcher,
    /// Seletor de respostas (corte de confiança + sorteio).
    selector: ResponseSelector,
    /// Backend de análise de sentimento.
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl Chatbot {
    /// Monta o engine: pré-processa os padrões do catálogo via encoder.
    ///
    /// # Erros
    ///
    /// Propaga falhas de embedding do pré-processamento — fatal na
    /// inicialização, o processo não deve servir parcialmente iniciado.
    pub fn new(
        catalog: Vec<Intent>,
        encoder: Arc<dyn SemanticEncoder>,
        sentiment: Arc<dyn SentimentAnalyzer>,
    ) -> Result<Self> {
        let matcher = PatternMatcher::new(encoder, &catalog)?;
        Ok(Self {
            catalog,
            matcher,
            selector: ResponseSelector::new(),
            sentiment,
        })
    }

    /// Variante com seletor semeado — usada nos testes de distribuição.
    #[cfg(test)]
    pub fn with_seeded_selector(
        catalog: Vec<Intent>,
        encoder: Arc<dyn SemanticEncoder>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        seed: u64,
    ) -> Result<Self> {
        let matcher = PatternMatcher::new(encoder, &catalog)?;
        Ok(Self {
            catalog,
            matcher,
            selector: ResponseSelector::with_seed(seed),
            sentiment,
        })
    }

    /// Processa uma mensagem e monta o resultado completo.
    ///
    /// Sequência: classificar intent → rotular sentimento → selecionar
    /// resposta → aumentar pelo contexto. O intent **reportado** é
    /// `"unknown"` sempre que a confiança não passa do corte — e é esse
    /// nome reportado que o aumentador recebe, então nenhuma regra de
    /// contexto dispara sobre o fallback.
    ///
    /// # Erros
    ///
    /// Propaga falhas dos backends de embedding e sentimento, sem retry
    /// e sem resultado parcial.
    pub fn process(&self, text: &str, context: Option<&UserContext>) -> Result<MessageResult> {
        let detection = self.matcher.detect(text)?;
        let sentiment = self.sentiment.classify(text)?;

        let (response, action) = self.selector.select(&detection, &self.catalog);

        let intent = if detection.confidence > CONFIDENCE_THRESHOLD {
            detection.intent
        } else {
            UNKNOWN_INTENT.to_string()
        };
        let response = augment(response, &intent, context);

        tracing::info!(
            intent = %intent,
            confidence = detection.confidence,
            sentiment = %sentiment,
            action = ?action,
            "Mensagem processada"
        );
        Ok(MessageResult {
            response,
            intent,
            confidence: detection.confidence,
            action,
            sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::responder::FALLBACK_RESPONSE;
    use crate::testutil::{BagOfWordsEncoder, FailingSentiment, FixedSentiment};

    fn chatbot() -> Chatbot {
        Chatbot::with_seeded_selector(
            default_catalog(),
            Arc::new(BagOfWordsEncoder::default()),
            Arc::new(FixedSentiment("5 stars")),
            42,
        )
        .unwrap()
    }

    fn context(json: &str) -> UserContext {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn bonjour_resolves_to_greeting() {
        let result = chatbot().process("bonjour", None).unwrap();
        assert_eq!(result.intent, "greeting");
        assert!(result.confidence > 0.5);
        assert_eq!(result.action, None);
        assert_eq!(result.sentiment, "5 stars");

        let greeting = default_catalog()
            .into_iter()
            .find(|i| i.name == "greeting")
            .unwrap();
        assert!(greeting.responses.contains(&result.response));
    }

    #[test]
    fn account_opening_carries_redirect_action() {
        let result = chatbot().process("comment ouvrir un compte", None).unwrap();
        assert_eq!(result.intent, "account_creation");
        assert_eq!(result.action.as_deref(), Some("redirect_to_account_creation"));
    }

    #[test]
    fn gibberish_falls_back_to_unknown() {
        let result = chatbot().process("zzz qqq www", None).unwrap();
        assert_eq!(result.intent, "unknown");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.response, FALLBACK_RESPONSE);
        assert_eq!(result.action, None);
        // O sentimento é rotulado mesmo sem match de intent
        assert_eq!(result.sentiment, "5 stars");
    }

    #[test]
    fn authenticated_credit_question_reports_active_credits() {
        let ctx = context(r#"{"authenticated": true, "active_credits": 3}"#);
        let result = chatbot().process("simulation de crédit", Some(&ctx)).unwrap();
        assert_eq!(result.intent, "credit_info");
        assert!(result.response.contains("3 crédit(s) en cours"));
        assert_eq!(result.action.as_deref(), Some("redirect_to_credit_simulation"));
    }

    #[test]
    fn unauthenticated_credit_question_is_not_augmented() {
        let ctx = context(r#"{"authenticated": false, "active_credits": 3}"#);
        let result = chatbot().process("simulation de crédit", Some(&ctx)).unwrap();
        assert_eq!(result.intent, "credit_info");
        assert!(!result.response.contains("crédit(s) en cours"));
    }

    #[test]
    fn unknown_intent_is_never_augmented_even_authenticated() {
        // Mesmo autenticado, o fallback não ganha a frase de créditos:
        // o aumentador recebe o intent reportado ("unknown")
        let ctx = context(r#"{"authenticated": true, "active_credits": 3}"#);
        let result = chatbot().process("zzz qqq www", Some(&ctx)).unwrap();
        assert_eq!(result.intent, "unknown");
        assert_eq!(result.response, FALLBACK_RESPONSE);
    }

    #[test]
    fn classification_is_idempotent_across_calls() {
        let bot = chatbot();
        let first = bot.process("bonjour", None).unwrap();
        for _ in 0..10 {
            let next = bot.process("bonjour", None).unwrap();
            assert_eq!(next.intent, first.intent);
            assert_eq!(next.confidence, first.confidence);
        }
    }

    #[test]
    fn greeting_draws_cover_the_whole_response_set() {
        let bot = chatbot();
        let greeting = default_catalog()
            .into_iter()
            .find(|i| i.name == "greeting")
            .unwrap();

        let mut observed = std::collections::HashSet::new();
        for _ in 0..100 {
            let result = bot.process("bonjour", None).unwrap();
            assert!(greeting.responses.contains(&result.response));
            observed.insert(result.response);
        }
        assert_eq!(observed.len(), greeting.responses.len());
    }

    #[test]
    fn sentiment_failure_surfaces_as_request_error() {
        let bot = Chatbot::new(
            default_catalog(),
            Arc::new(BagOfWordsEncoder::default()),
            Arc::new(FailingSentiment),
        )
        .unwrap();
        assert!(bot.process("bonjour", None).is_err());
    }
}
