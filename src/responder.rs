//! # Responder — Seleção de Resposta e Aumento por Contexto
//!
//! Duas políticas puras sobre o resultado da classificação:
//!
//! 1. **Seleção** ([`ResponseSelector`]): aplica o corte de confiança e
//!    sorteia uma resposta do intent vencedor, carregando sua action.
//! 2. **Aumento** ([`augment`]): enriquece a resposta escolhida com dados
//!    de sessão do chamador, via uma tabela fechada `intent → função`.
//!
//! ## Política de Corte
//!
//! | Condição | Resposta | Action |
//! |----------|----------|--------|
//! | `confidence > 0.5` e intent no catálogo | sorteio uniforme nas respostas do intent | a do intent |
//! | `confidence <= 0.5` | [`FALLBACK_RESPONSE`] fixa | nenhuma |
//! | intent fora do catálogo (não deveria ocorrer) | [`FALLBACK_RESPONSE`] fixa | nenhuma |
//!
//! O comparador é **estritamente maior** — confiança exatamente 0.5 cai
//! no fallback, casando com o comparador estrito do matcher. Baixa
//! confiança não é erro: é o caminho definido do intent `"unknown"`.

use std::fmt::Write as _;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::catalog::Intent;
use crate::context::UserContext;
use crate::matcher::Detection;

/// Resposta fixa quando nenhum intent passa do corte de confiança.
pub const FALLBACK_RESPONSE: &str =
    "Je suis désolé, je n'ai pas compris. Souhaitez-vous parler à un conseiller ?";

/// Corte de confiança — um match só conta se `confidence > 0.5` (estrito).
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Seletor de respostas com fonte de aleatoriedade injetada.
///
/// O sorteio uniforme usa um [`StdRng`] semeável atrás de um `Mutex` —
/// requisições concorrentes serializam só o sorteio (nanossegundos), e os
/// testes fixam a semente para tornar a distribuição determinística.
pub struct ResponseSelector {
    /// Fonte de aleatoriedade do sorteio de respostas.
    rng: Mutex<StdRng>,
}

impl ResponseSelector {
    /// Cria um seletor com semente do sistema operacional.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Cria um seletor com semente fixa — para testes de distribuição.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seleciona a resposta e a action para uma detecção.
    ///
    /// No match, o intent é localizado **por nome** no catálogo (primeira
    /// ocorrência vence se houver duplicatas) e uma resposta é sorteada
    /// uniformemente do seu conjunto. Se o nome vencedor não existir no
    /// catálogo — o matcher só devolve nomes do catálogo ou `"unknown"`,
    /// então isso não deveria ocorrer — cai no fallback.
    pub fn select(&self, detection: &Detection, catalog: &[Intent]) -> (String, Option<String>) {
        if detection.confidence <= CONFIDENCE_THRESHOLD {
            return (FALLBACK_RESPONSE.to_string(), None);
        }

        match catalog.iter().find(|i| i.name == detection.intent) {
            Some(intent) => {
                let mut rng = self.rng.lock();
                let response = intent
                    .responses
                    .choose(&mut *rng)
                    .cloned()
                    // responses é validado não-vazio no carregamento
                    .unwrap_or_else(|| FALLBACK_RESPONSE.to_string());
                (response, intent.action.clone())
            }
            None => (FALLBACK_RESPONSE.to_string(), None),
        }
    }
}

impl Default for ResponseSelector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Aumento por contexto ────────────────────────────────────────

/// Função de aumento: recebe a resposta escolhida e o contexto da sessão.
type AugmentFn = fn(&mut String, &UserContext);

/// Tabela fechada de regras de aumento, indexada pelo nome do intent.
///
/// Hoje só `credit_info` tem regra; novas regras entram como novas linhas
/// da tabela, não como condicionais no orquestrador.
const AUGMENTERS: &[(&str, AugmentFn)] = &[("credit_info", append_active_credits)];

/// Aumenta a resposta com dados de sessão, se houver regra aplicável.
///
/// Função pura (além da construção da string): sem contexto, sem
/// autenticação, ou sem regra para o intent, a resposta volta intacta.
/// O nome de intent recebido é o **reportado** — abaixo do corte de
/// confiança o orquestrador passa `"unknown"`, então nenhuma regra
/// dispara sobre o fallback.
pub fn augment(mut response: String, intent: &str, context: Option<&UserContext>) -> String {
    let Some(ctx) = context else {
        return response;
    };
    if !ctx.authenticated() {
        return response;
    }
    if let Some((_, augmenter)) = AUGMENTERS.iter().find(|(name, _)| *name == intent) {
        augmenter(&mut response, ctx);
    }
    response
}

/// Regra `credit_info`: anexa a contagem de créditos ativos do usuário.
fn append_active_credits(response: &mut String, ctx: &UserContext) {
    let _ = write!(
        response,
        "\n\nVous avez actuellement {} crédit(s) en cours.",
        ctx.active_credits()
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::matcher::UNKNOWN_INTENT;

    fn catalog() -> Vec<Intent> {
        vec![
            Intent {
                name: "greeting".to_string(),
                patterns: vec!["bonjour".to_string()],
                responses: vec!["Bonjour !".to_string(), "Salut !".to_string()],
                action: None,
            },
            Intent {
                name: "credit_info".to_string(),
                patterns: vec!["taux d'intérêt".to_string()],
                responses: vec!["Voici nos crédits.".to_string()],
                action: Some("redirect_to_credit_simulation".to_string()),
            },
        ]
    }

    fn detection(intent: &str, confidence: f32) -> Detection {
        Detection {
            intent: intent.to_string(),
            confidence,
        }
    }

    fn context(json: &str) -> UserContext {
        serde_json::from_str(json).unwrap()
    }

    // ─── select ────────────────────────────────────────────────

    #[test]
    fn low_confidence_falls_back_without_action() {
        let selector = ResponseSelector::with_seed(7);
        let (response, action) = selector.select(&detection("greeting", 0.3), &catalog());
        assert_eq!(response, FALLBACK_RESPONSE);
        assert_eq!(action, None);
    }

    #[test]
    fn threshold_is_strict_at_exactly_half() {
        let selector = ResponseSelector::with_seed(7);
        let (response, action) = selector.select(&detection("greeting", 0.5), &catalog());
        assert_eq!(response, FALLBACK_RESPONSE);
        assert_eq!(action, None);
    }

    #[test]
    fn just_above_threshold_matches() {
        let selector = ResponseSelector::with_seed(7);
        let (response, _) = selector.select(&detection("greeting", 0.500001), &catalog());
        assert_ne!(response, FALLBACK_RESPONSE);
    }

    #[test]
    fn match_carries_the_intent_action() {
        let selector = ResponseSelector::with_seed(7);
        let (response, action) = selector.select(&detection("credit_info", 0.9), &catalog());
        assert_eq!(response, "Voici nos crédits.");
        assert_eq!(action.as_deref(), Some("redirect_to_credit_simulation"));
    }

    #[test]
    fn unknown_name_falls_back_defensively() {
        let selector = ResponseSelector::with_seed(7);
        let (response, action) = selector.select(&detection("ghost_intent", 0.9), &catalog());
        assert_eq!(response, FALLBACK_RESPONSE);
        assert_eq!(action, None);
    }

    #[test]
    fn responses_are_drawn_only_from_the_winning_set() {
        let selector = ResponseSelector::with_seed(42);
        let catalog = catalog();
        let expected: HashSet<&str> = ["Bonjour !", "Salut !"].into();

        let mut observed = HashSet::new();
        for _ in 0..100 {
            let (response, _) = selector.select(&detection("greeting", 0.9), &catalog);
            assert!(expected.contains(response.as_str()), "foreign response {response:?}");
            observed.insert(response);
        }
        // Com 100 sorteios uniformes sobre 2 respostas, as duas aparecem
        assert_eq!(observed.len(), expected.len());
    }

    #[test]
    fn duplicate_names_resolve_to_first_occurrence() {
        let mut cat = catalog();
        cat.push(Intent {
            name: "greeting".to_string(),
            patterns: vec![],
            responses: vec!["imposteur".to_string()],
            action: Some("should_not_surface".to_string()),
        });
        let selector = ResponseSelector::with_seed(7);
        for _ in 0..20 {
            let (response, action) = selector.select(&detection("greeting", 0.9), &cat);
            assert_ne!(response, "imposteur");
            assert_eq!(action, None);
        }
    }

    // ─── augment ───────────────────────────────────────────────

    #[test]
    fn credit_info_appends_active_credits() {
        let ctx = context(r#"{"authenticated": true, "active_credits": 3}"#);
        let out = augment("Voici nos crédits.".to_string(), "credit_info", Some(&ctx));
        assert!(out.starts_with("Voici nos crédits."));
        assert!(out.contains("3 crédit(s) en cours"));
    }

    #[test]
    fn missing_credit_count_defaults_to_zero() {
        let ctx = context(r#"{"authenticated": true}"#);
        let out = augment("Voici nos crédits.".to_string(), "credit_info", Some(&ctx));
        assert!(out.contains("0 crédit(s) en cours"));
    }

    #[test]
    fn unauthenticated_context_leaves_response_untouched() {
        let ctx = context(r#"{"authenticated": false, "active_credits": 3}"#);
        let out = augment("Voici nos crédits.".to_string(), "credit_info", Some(&ctx));
        assert_eq!(out, "Voici nos crédits.");
    }

    #[test]
    fn other_intents_are_never_augmented() {
        let ctx = context(r#"{"authenticated": true, "active_credits": 3}"#);
        for name in ["greeting", UNKNOWN_INTENT] {
            let out = augment("Bonjour !".to_string(), name, Some(&ctx));
            assert_eq!(out, "Bonjour !");
        }
    }

    #[test]
    fn absent_context_leaves_response_untouched() {
        let out = augment("Voici nos crédits.".to_string(), "credit_info", None);
        assert_eq!(out, "Voici nos crédits.");
    }
}
