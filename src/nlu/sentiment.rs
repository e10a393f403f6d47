//! # Classificador de Sentimento — BERT Multilíngue
//!
//! O [`SentimentClassifier`] rotula o sentimento de cada mensagem usando
//! o modelo **nlptown/bert-base-multilingual-uncased-sentiment**, que
//! classifica textos (francês incluído) em 5 rótulos de `"1 star"` a
//! `"5 stars"`.
//!
//! ## Pipeline de Classificação
//!
//! ```text
//! Texto → Tokenizer → BERT Forward → token CLS → pooler (dense + tanh)
//!                                                      ↓
//!                                     classifier (linear) → softmax → argmax
//!                                                      ↓
//!                                            rótulo de id2label
//! ```
//!
//! O checkpoint segue o layout `BertForSequenceClassification` do
//! HuggingFace: o encoder em `bert.*`, o pooler em `bert.pooler.dense` e
//! a cabeça de classificação em `classifier`. O candle fornece só o
//! encoder ([`bert::BertModel`]) — pooler e classifier são carregados
//! aqui como camadas `Linear` avulsas.
//!
//! O rótulo retornado é **opaco** para o resto do sistema: o engine o
//! repassa no resultado sem interpretá-lo.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use super::embedder::build_bert_tokenizer;
use super::SentimentAnalyzer;

/// Repositório HuggingFace do modelo de sentimento (5 classes).
const SENTIMENT_MODEL_REPO: &str = "nlptown/bert-base-multilingual-uncased-sentiment";

/// Sub-conjunto do `config.json` que o encoder do candle não expõe:
/// a dimensão oculta (para as camadas da cabeça) e o mapa de índices de
/// classe para rótulos legíveis.
#[derive(serde::Deserialize)]
struct ClassifierConfig {
    /// Dimensão oculta do encoder (entrada do pooler e do classifier).
    hidden_size: usize,
    /// Mapa `"0" → "1 star"`, ..., `"4" → "5 stars"`.
    id2label: std::collections::HashMap<String, String>,
}

/// Classificador de sentimento BERT — produz um rótulo por mensagem.
pub struct SentimentClassifier {
    /// Encoder BERT carregado — Candle `BertModel`.
    model: bert::BertModel,
    /// Pooler do checkpoint: dense + tanh sobre o token CLS.
    pooler: Linear,
    /// Cabeça de classificação: hidden_size → num_labels.
    classifier: Linear,
    /// Tokenizer WordPiece (uncased) do modelo.
    tokenizer: Tokenizer,
    /// Rótulos na ordem dos índices de classe (de `id2label`).
    labels: Vec<String>,
    /// Device de execução (atualmente sempre CPU).
    device: Device,
}

impl SentimentClassifier {
    /// Carrega o modelo de sentimento do HuggingFace Hub.
    ///
    /// Mesma estratégia de fallback do embedder (tokenizer.json →
    /// vocab.txt, safetensors → pytorch_model.bin), com uma diferença:
    /// o checkpoint é **uncased**, então o tokenizer construído de
    /// vocab.txt aplica lowercase.
    ///
    /// Falha aqui é fatal na inicialização — o processo não serve sem o
    /// backend de sentimento.
    ///
    /// # Erros
    ///
    /// Retorna erro se o download falhar, os pesos estiverem corrompidos,
    /// ou o `config.json` não tiver um `id2label` consistente.
    pub fn load() -> Result<Self> {
        let device = Device::Cpu;

        tracing::info!(
            "Loading sentiment model ({}) from HuggingFace Hub...",
            SENTIMENT_MODEL_REPO
        );
        let api = Api::new().context("Failed to create HF Hub API")?;
        let repo = api.model(SENTIMENT_MODEL_REPO.to_string());

        // ─── Tokenizer ────────────────────────────────────────────
        let config_path = repo
            .get("config.json")
            .context("Failed to download config.json")?;
        let tokenizer = match repo.get("tokenizer.json") {
            Ok(tokenizer_path) => {
                Tokenizer::from_file(&tokenizer_path)
                    .map_err(|e| anyhow::anyhow!("{}", e))?
            }
            Err(_) => {
                tracing::info!(
                    "tokenizer.json not available, building WordPiece from vocab.txt..."
                );
                let vocab_path = repo
                    .get("vocab.txt")
                    .context("Failed to download vocab.txt")?;
                build_bert_tokenizer(
                    vocab_path
                        .to_str()
                        .context("Invalid vocab.txt path encoding")?,
                    // Modelo uncased — tokenizer aplica lowercase
                    true,
                )?
            }
        };

        // ─── Config do modelo + rótulos ───────────────────────────
        let config_str = std::fs::read_to_string(&config_path)?;
        let config: bert::Config =
            serde_json::from_str(&config_str).context("Failed to parse model config")?;
        let cls_config: ClassifierConfig =
            serde_json::from_str(&config_str).context("Failed to parse id2label map")?;
        let labels = ordered_labels(&cls_config)?;

        // ─── Pesos do modelo ──────────────────────────────────────
        let vb = match repo.get("model.safetensors") {
            Ok(safetensors_path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[safetensors_path], DType::F32, &device)
                    .context("Failed to load safetensors weights")?
            },
            Err(_) => {
                tracing::info!("Falling back to pytorch_model.bin...");
                let weights_path = repo
                    .get("pytorch_model.bin")
                    .context("Failed to download pytorch_model.bin")?;
                VarBuilder::from_pth(&weights_path, DType::F32, &device)
                    .context("Failed to load pytorch weights")?
            }
        };

        // O encoder resolve sozinho o prefixo "bert." do checkpoint;
        // pooler e classifier ficam fora dele e são carregados à parte.
        let hidden = cls_config.hidden_size;
        let model = bert::BertModel::load(vb.clone(), &config)
            .context("Failed to load sentiment BERT encoder")?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))
            .or_else(|_| linear(hidden, hidden, vb.pp("pooler.dense")))
            .context("Failed to load pooler weights")?;
        let classifier = linear(hidden, labels.len(), vb.pp("classifier"))
            .context("Failed to load classifier weights")?;

        tracing::info!(labels = labels.len(), "Sentiment model loaded on {:?}", device);
        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer,
            labels,
            device,
        })
    }

    /// Classifica o sentimento de um texto → rótulo de `id2label`.
    ///
    /// # Erros
    ///
    /// Retorna erro se a tokenização ou o forward pass falhar.
    pub fn classify_text(&self, text: &str) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))?;

        let ids = encoding.get_ids();
        let attention_mask_vec: Vec<u32> = encoding.get_attention_mask().to_vec();
        let token_type_ids_vec: Vec<u32> = vec![0u32; ids.len()];

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(&token_type_ids_vec[..], &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(&attention_mask_vec[..], &self.device)?.unsqueeze(0)?;

        // Forward pass — [1, seq_len, hidden]
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // ─── Cabeça de classificação ──────────────────────────────
        // Token CLS (posição 0) → pooler dense + tanh → classifier
        let cls = output.narrow(1, 0, 1)?.squeeze(1)?; // [1, hidden]
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?; // [1, num_labels]
        let probs: Vec<f32> = softmax(&logits, 1)?.squeeze(0)?.to_vec1()?;

        // Argmax com comparador estrito — o primeiro rótulo com a
        // probabilidade máxima vence
        let mut best = 0usize;
        let mut best_score = f32::MIN;
        for (i, p) in probs.iter().enumerate() {
            if *p > best_score {
                best_score = *p;
                best = i;
            }
        }

        let label = self
            .labels
            .get(best)
            .cloned()
            .with_context(|| format!("no label for class index {best}"))?;
        tracing::debug!(label = %label, score = best_score, "Sentiment classified");
        Ok(label)
    }
}

impl SentimentAnalyzer for SentimentClassifier {
    fn classify(&self, text: &str) -> Result<String> {
        self.classify_text(text)
    }
}

/// Converte o mapa `id2label` em um vetor indexado por classe.
///
/// # Erros
///
/// Retorna erro se as chaves não forem índices contíguos a partir de 0.
fn ordered_labels(config: &ClassifierConfig) -> Result<Vec<String>> {
    let mut labels = vec![String::new(); config.id2label.len()];
    for (idx, label) in &config.id2label {
        let idx: usize = idx
            .parse()
            .with_context(|| format!("non-numeric class index {idx:?} in id2label"))?;
        let slot = labels
            .get_mut(idx)
            .with_context(|| format!("class index {idx} out of range in id2label"))?;
        *slot = label.clone();
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> ClassifierConfig {
        ClassifierConfig {
            hidden_size: 768,
            id2label: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn labels_are_ordered_by_class_index() {
        let config = config_with(&[("1", "2 stars"), ("0", "1 star"), ("2", "3 stars")]);
        let labels = ordered_labels(&config).unwrap();
        assert_eq!(labels, vec!["1 star", "2 stars", "3 stars"]);
    }

    #[test]
    fn non_numeric_index_is_rejected() {
        let config = config_with(&[("positive", "POSITIVE")]);
        assert!(ordered_labels(&config).is_err());
    }

    #[test]
    fn sparse_indices_are_rejected() {
        // Duas entradas mas índice máximo 2 → fora do range do vetor
        let config = config_with(&[("0", "1 star"), ("2", "3 stars")]);
        assert!(ordered_labels(&config).is_err());
    }
}
