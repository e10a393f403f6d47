//! # Catálogo de Intents — Carregamento e Seed Padrão
//!
//! Módulo responsável pelo catálogo de intents do assistente: carrega
//! `intents.json` do disco ou, se o arquivo não existir, usa o catálogo
//! padrão embutido (FAQs bancárias da AmenBank, em francês).
//!
//! ## Formato do Arquivo
//!
//! Um array JSON de registros [`Intent`]:
//!
//! ```json
//! [
//!   {
//!     "name": "greeting",
//!     "patterns": ["bonjour", "salut"],
//!     "responses": ["Bonjour ! Comment puis-je vous aider ?"],
//!     "action": null
//!   }
//! ]
//! ```
//!
//! ## Política de Carregamento
//!
//! | Situação | Comportamento |
//! |----------|---------------|
//! | Arquivo ausente | Catálogo padrão (não é erro) |
//! | Arquivo ilegível | [`CatalogError::Io`] — fatal |
//! | JSON inválido | [`CatalogError::Parse`] — fatal |
//! | Intent sem respostas | [`CatalogError::InvalidIntent`] — fatal |
//!
//! Ausente e malformado são casos **distintos**: só a ausência cai no
//! catálogo padrão. O catálogo carregado é imutável durante toda a vida
//! do processo — nenhuma requisição modifica intents.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caminho do catálogo de intents (relativo ao diretório de execução).
pub const CATALOG_PATH: &str = "intents.json";

/// Uma regra nomeada do assistente: frases-gatilho e respostas candidatas.
///
/// Carregado uma única vez na inicialização; somente leitura depois disso.
/// A ordem dos intents no catálogo é significativa — o desempate do
/// classificador segue a ordem de carregamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Identificador único do intent (ex.: `"greeting"`, `"credit_info"`).
    pub name: String,
    /// Frases-exemplo que disparam este intent (duplicatas permitidas).
    pub patterns: Vec<String>,
    /// Respostas candidatas — uma é sorteada uniformemente a cada match.
    pub responses: Vec<String>,
    /// Tag opaca opcional consumida pelo frontend (ex.: redirect de UI).
    #[serde(default)]
    pub action: Option<String>,
}

/// Falhas de carregamento do catálogo.
///
/// Todas as variantes são fatais na inicialização — um catálogo presente
/// mas malformado nunca é silenciosamente substituído pelo padrão.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// O arquivo existe mas não pôde ser lido.
    #[error("failed to read intent catalog at {path}: {source}")]
    Io {
        /// Caminho do arquivo que falhou.
        path: String,
        /// Erro de I/O subjacente.
        #[source]
        source: std::io::Error,
    },

    /// O arquivo foi lido mas não é um array JSON de intents válido.
    #[error("failed to parse intent catalog at {path}: {source}")]
    Parse {
        /// Caminho do arquivo que falhou.
        path: String,
        /// Erro de desserialização subjacente.
        #[source]
        source: serde_json::Error,
    },

    /// Um intent do catálogo viola o modelo de dados.
    #[error("invalid intent {name:?}: {reason}")]
    InvalidIntent {
        /// Nome do intent inválido.
        name: String,
        /// Descrição da violação.
        reason: String,
    },
}

/// Carrega o catálogo de intents do disco, ou o padrão se não existir.
///
/// ## Política
///
/// - Arquivo **ausente** → catálogo padrão embutido (logado em info).
/// - Arquivo **presente mas inválido** → erro propagado; o processo não
///   deve começar a servir com um catálogo corrompido.
///
/// Após desserializar, valida cada intent ([`validate`]) e avisa sobre
/// nomes duplicados — o primeiro vence na seleção de resposta.
///
/// # Erros
///
/// Retorna [`CatalogError`] se o arquivo existir mas estiver ilegível,
/// malformado, ou contiver um intent sem respostas.
pub fn load_catalog(path: &Path) -> Result<Vec<Intent>, CatalogError> {
    if !path.exists() {
        tracing::info!(
            path = %path.display(),
            "Nenhum catálogo encontrado, usando o catálogo padrão"
        );
        return Ok(default_catalog());
    }

    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let intents: Vec<Intent> =
        serde_json::from_str(&json).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    validate(&intents)?;
    tracing::info!(
        path = %path.display(),
        intents = intents.len(),
        "Catálogo de intents carregado do disco"
    );
    Ok(intents)
}

/// Valida o modelo de dados do catálogo.
///
/// Regras:
/// - Todo intent precisa de ao menos uma resposta (o seletor sorteia
///   uniformemente dentro do conjunto — conjunto vazio seria um pânico).
/// - Nomes duplicados são tolerados mas avisados: a busca por nome na
///   seleção pega a primeira ocorrência.
fn validate(intents: &[Intent]) -> Result<(), CatalogError> {
    let mut seen: Vec<&str> = Vec::with_capacity(intents.len());
    for intent in intents {
        if intent.responses.is_empty() {
            return Err(CatalogError::InvalidIntent {
                name: intent.name.clone(),
                reason: "responses must not be empty".to_string(),
            });
        }
        if seen.contains(&intent.name.as_str()) {
            tracing::warn!(name = %intent.name, "Nome de intent duplicado no catálogo, o primeiro vence");
        } else {
            seen.push(&intent.name);
        }
    }
    Ok(())
}

/// Catálogo padrão embutido — FAQs bancárias da AmenBank em francês.
///
/// Usado quando `intents.json` não existe. Cobre o conjunto mínimo:
/// saudação, abertura de conta, crédito, ajuda e despedida. Tratado como
/// fixture — o conteúdo real de produção vem do arquivo externo.
pub fn default_catalog() -> Vec<Intent> {
    vec![
        Intent {
            name: "greeting".to_string(),
            patterns: vec![
                "bonjour".to_string(),
                "salut".to_string(),
                "bonsoir".to_string(),
                "coucou".to_string(),
                "comment ça va".to_string(),
                "ça va".to_string(),
                "comment allez-vous".to_string(),
            ],
            responses: vec![
                "Bonjour ! Comment puis-je vous aider aujourd'hui ?".to_string(),
                "Bonjour ! Je suis l'assistant virtuel d'AmenBank. Que puis-je faire pour vous ?"
                    .to_string(),
            ],
            action: None,
        },
        Intent {
            name: "account_creation".to_string(),
            patterns: vec![
                "comment ouvrir un compte".to_string(),
                "créer un compte".to_string(),
                "ouvrir un compte".to_string(),
                "nouveau compte".to_string(),
                "démarche pour ouvrir un compte".to_string(),
            ],
            responses: vec![
                "Pour ouvrir un compte chez AmenBank, vous pouvez :\n1. Visiter une de nos agences\n2. Utiliser notre service en ligne\n3. Appeler notre service client\n\nQuelle option préférez-vous ?"
                    .to_string(),
            ],
            action: Some("redirect_to_account_creation".to_string()),
        },
        Intent {
            name: "credit_info".to_string(),
            patterns: vec![
                "taux d'intérêt".to_string(),
                "taux d'interet".to_string(),
                "taux de crédit".to_string(),
                "conditions de crédit".to_string(),
                "simulation de crédit".to_string(),
                "demande de crédit".to_string(),
                "prêt immobilier".to_string(),
                "prêt personnel".to_string(),
            ],
            responses: vec![
                "Je peux vous aider avec les informations sur nos crédits. Nous proposons différents types de prêts :\n- Prêt immobilier\n- Prêt personnel\n- Crédit auto\n\nQuel type de crédit vous intéresse ?"
                    .to_string(),
            ],
            action: Some("redirect_to_credit_simulation".to_string()),
        },
        Intent {
            name: "help".to_string(),
            patterns: vec![
                "aide".to_string(),
                "help".to_string(),
                "comment ça marche".to_string(),
                "je ne comprends pas".to_string(),
                "expliquez-moi".to_string(),
            ],
            responses: vec![
                "Je suis là pour vous aider ! Vous pouvez me poser des questions sur :\n- L'ouverture de compte\n- Les crédits et prêts\n- Les services bancaires\n- Les taux d'intérêt\n\nQue souhaitez-vous savoir ?"
                    .to_string(),
            ],
            action: None,
        },
        Intent {
            name: "goodbye".to_string(),
            patterns: vec![
                "au revoir".to_string(),
                "bye".to_string(),
                "à bientôt".to_string(),
                "merci au revoir".to_string(),
                "je m'en vais".to_string(),
                "à plus tard".to_string(),
            ],
            responses: vec![
                "Au revoir ! N'hésitez pas à revenir si vous avez d'autres questions.".to_string(),
                "À bientôt ! Bonne journée !".to_string(),
            ],
            action: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_catalog_has_seed_intents() {
        let catalog = default_catalog();
        let names: Vec<&str> = catalog.iter().map(|i| i.name.as_str()).collect();
        for expected in ["greeting", "account_creation", "credit_info", "help", "goodbye"] {
            assert!(names.contains(&expected), "missing seed intent {expected}");
        }
    }

    #[test]
    fn default_catalog_is_valid() {
        assert!(validate(&default_catalog()).is_ok());
    }

    #[test]
    fn greeting_responds_to_bonjour() {
        let catalog = default_catalog();
        let greeting = catalog.iter().find(|i| i.name == "greeting").unwrap();
        assert!(greeting.patterns.iter().any(|p| p == "bonjour"));
        assert!(!greeting.responses.is_empty());
        assert!(greeting.action.is_none());
    }

    #[test]
    fn account_creation_carries_redirect_action() {
        let catalog = default_catalog();
        let intent = catalog.iter().find(|i| i.name == "account_creation").unwrap();
        assert_eq!(
            intent.action.as_deref(),
            Some("redirect_to_account_creation")
        );
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), default_catalog().len());
    }

    #[test]
    fn valid_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"name": "ping", "patterns": ["ping"], "responses": ["pong"]}}]"#
        )
        .unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "ping");
        assert_eq!(catalog[0].action, None);
    }

    #[test]
    fn malformed_file_is_an_error_not_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        std::fs::write(&path, "{ not json ]").unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn intent_without_responses_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        std::fs::write(
            &path,
            r#"[{"name": "mute", "patterns": ["..."], "responses": []}]"#,
        )
        .unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIntent { .. }));
    }
}
