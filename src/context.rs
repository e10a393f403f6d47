//! # Contexto de Usuário — Dados de Sessão Fornecidos pelo Chamador
//!
//! O [`UserContext`] transporta dados opacos de sessão enviados junto com
//! a mensagem (ex.: status de autenticação, créditos ativos). O engine
//! nunca persiste nem modifica esse contexto — ele é entrada somente
//! leitura do aumentador de respostas.
//!
//! O formato é um objeto JSON livre; as chaves que o aumentador conhece
//! são lidas por acessores tipados com defaults seguros:
//!
//! | Chave | Tipo | Default |
//! |-------|------|---------|
//! | `authenticated` | bool | `false` |
//! | `active_credits` | inteiro | `0` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dados opacos de sessão fornecidos pelo chamador a cada mensagem.
///
/// Serializa de forma transparente como o próprio objeto JSON — o corpo
/// `{"user_context": {"authenticated": true}}` desserializa direto.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserContext(Map<String, Value>);

impl UserContext {
    /// `true` se o chamador declarou o usuário como autenticado.
    ///
    /// Chave ausente ou de tipo inesperado conta como não autenticado.
    pub fn authenticated(&self) -> bool {
        self.0
            .get("authenticated")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Número de créditos ativos do usuário (default 0 se ausente).
    pub fn active_credits(&self) -> u64 {
        self.0
            .get("active_credits")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_from(json: &str) -> UserContext {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_context_defaults() {
        let ctx = UserContext::default();
        assert!(!ctx.authenticated());
        assert_eq!(ctx.active_credits(), 0);
    }

    #[test]
    fn typed_accessors_read_json_keys() {
        let ctx = context_from(r#"{"authenticated": true, "active_credits": 3}"#);
        assert!(ctx.authenticated());
        assert_eq!(ctx.active_credits(), 3);
    }

    #[test]
    fn wrong_types_fall_back_to_defaults() {
        let ctx = context_from(r#"{"authenticated": "yes", "active_credits": "beaucoup"}"#);
        assert!(!ctx.authenticated());
        assert_eq!(ctx.active_credits(), 0);
    }

    #[test]
    fn unknown_keys_are_preserved_opaquely() {
        let ctx = context_from(r#"{"plan": "gold", "authenticated": true}"#);
        assert!(ctx.authenticated());
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("gold"));
    }
}
