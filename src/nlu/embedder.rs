//! # Embedder BERT Francês — Representações Vetoriais dos Textos
//!
//! O [`Embedder`] encapsula um modelo **BERT** pré-treinado para francês
//! (`dbmdz/bert-base-french-europeana-cased`), usado para comparar
//! semanticamente a mensagem do usuário com os padrões do catálogo.
//!
//! ## Pipeline de Embedding
//!
//! ```text
//! Texto → Tokenizer → Token IDs → BERT Forward Pass → Mean Pooling → L2 Normalize
//!                                                          ↓
//!                                                    Vec<f32> (768-dim)
//! ```
//!
//! Com vetores L2-normalizados, a similaridade de cosseno se reduz ao
//! produto escalar — exatamente o que o matcher calcula por padrão.
//!
//! ## Carregamento do Modelo
//!
//! O modelo é baixado do HuggingFace Hub na primeira execução e cacheado
//! em `~/.cache/huggingface/`. O carregamento segue uma estratégia de
//! fallback:
//!
//! | Componente | Preferido | Fallback |
//! |-----------|-----------|----------|
//! | Tokenizer | `tokenizer.json` | `vocab.txt` (WordPiece) |
//! | Pesos | `model.safetensors` | `pytorch_model.bin` |
//! | Device | CPU | — (Metal não suporta layer-norm do BERT) |

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use super::SemanticEncoder;

/// Repositório HuggingFace do modelo de embeddings (BERT francês cased).
const EMBED_MODEL_REPO: &str = "dbmdz/bert-base-french-europeana-cased";

/// Embedder BERT — gera representações vetoriais de texto em francês.
///
/// Encapsula o modelo BERT, tokenizer, e device (CPU). Após carregamento
/// via [`Embedder::load()`], expõe:
///
/// - [`embed()`](Embedder::embed) — embedding de texto único
/// - [`embed_batch()`](Embedder::embed_batch) — múltiplos textos em uma forward pass
///
/// O batch é usado no pré-processamento do catálogo (todos os padrões de
/// um intent de uma vez); o método único atende cada mensagem.
pub struct Embedder {
    /// Modelo BERT carregado — Candle `BertModel`.
    model: bert::BertModel,
    /// Tokenizer WordPiece do modelo.
    tokenizer: Tokenizer,
    /// Device de execução (atualmente sempre CPU).
    device: Device,
}

impl Embedder {
    /// Carrega o modelo BERT francês do HuggingFace Hub.
    ///
    /// Operação pesada de I/O (download na primeira execução, leitura dos
    /// pesos) — por isso chamada dentro de `spawn_blocking` no `main.rs`.
    /// Falha aqui é fatal: sem embedder não há classificação de intent e
    /// o processo não deve começar a servir.
    ///
    /// # Erros
    ///
    /// Retorna erro se não conseguir acessar o HuggingFace Hub, se os
    /// arquivos do modelo estiverem corrompidos, ou se faltar memória.
    pub fn load() -> Result<Self> {
        // Candle 0.8 Metal carece do suporte a layer-norm exigido pelo BERT;
        // CPU é rápido o suficiente para inferência de um BERT-base.
        let device = Device::Cpu;

        tracing::info!("Loading French BERT ({}) from HuggingFace Hub...", EMBED_MODEL_REPO);
        let api = Api::new().context("Failed to create HF Hub API")?;
        let repo = api.model(EMBED_MODEL_REPO.to_string());

        // ─── Tokenizer ────────────────────────────────────────────
        let config_path = repo
            .get("config.json")
            .context("Failed to download config.json")?;
        // Tenta tokenizer.json primeiro; caso não exista, constrói um
        // tokenizer WordPiece a partir de vocab.txt
        let tokenizer = match repo.get("tokenizer.json") {
            Ok(tokenizer_path) => {
                tracing::info!("Loading tokenizer from tokenizer.json...");
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
                    // Modelo cased — mantém capitalização original
                    false,
                )?
            }
        };

        // ─── Config do modelo ─────────────────────────────────────
        let config_str = std::fs::read_to_string(&config_path)?;
        let config: bert::Config =
            serde_json::from_str(&config_str).context("Failed to parse model config")?;

        // ─── Pesos do modelo ──────────────────────────────────────
        // Prefere safetensors (rápido, seguro) sobre pytorch_model.bin (pickle)
        let vb = match repo.get("model.safetensors") {
            Ok(safetensors_path) => {
                tracing::info!("Loading from model.safetensors...");
                unsafe {
                    VarBuilder::from_mmaped_safetensors(
                        &[safetensors_path],
                        DType::F32,
                        &device,
                    )
                    .context("Failed to load safetensors weights")?
                }
            }
            Err(_) => {
                tracing::info!("Falling back to pytorch_model.bin...");
                let weights_path = repo
                    .get("pytorch_model.bin")
                    .context("Failed to download pytorch_model.bin")?;
                VarBuilder::from_pth(&weights_path, DType::F32, &device)
                    .context("Failed to load pytorch weights")?
            }
        };

        let model =
            bert::BertModel::load(vb, &config).context("Failed to load French BERT model")?;

        tracing::info!("Embedding model loaded on {:?}", device);
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Gera embedding de um texto único → `Vec<f32>` (768 dims, L2 normalizado).
    ///
    /// Mean pooling (média ponderada pelo attention mask) em vez do token
    /// CLS — produz embeddings melhores para similaridade semântica.
    ///
    /// # Erros
    ///
    /// Retorna erro se a tokenização ou o forward pass falhar.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))?;

        let ids = encoding.get_ids();
        let attention_mask_vec: Vec<u32> = encoding.get_attention_mask().to_vec();
        // Token type IDs = 0 para todos (segmento único, sem sentence pairs)
        let token_type_ids_vec: Vec<u32> = vec![0u32; ids.len()];

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(&token_type_ids_vec[..], &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(&attention_mask_vec[..], &self.device)?.unsqueeze(0)?;

        // Forward pass — BertModel retorna tensor [1, seq_len, 768]
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // ─── Mean Pooling ─────────────────────────────────────────
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(output.shape())?;

        // Zera os tokens de padding e faz a média pelos tokens reais
        let masked = (output * mask_expanded.clone())?;
        let summed = masked.sum(1)?;
        let mask_sum = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / mask_sum)?;

        // ─── L2 Normalize ─────────────────────────────────────────
        // ||v|| = 1 → cosine_similarity(a, b) = dot(a, b)
        let norm = pooled.sqr()?.sum(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm.unsqueeze(1)?)?;

        let embedding: Vec<f32> = normalized.squeeze(0)?.to_vec1()?;
        Ok(embedding)
    }

    /// Gera embeddings de múltiplos textos em uma única forward pass.
    ///
    /// Usado no pré-processamento do catálogo: os padrões de cada intent
    /// são embeddados juntos, com padding até o texto mais longo do batch.
    /// O attention mask garante que o padding não influencie o resultado.
    ///
    /// # Retorno
    ///
    /// `Vec<Vec<f32>>` — um embedding 768-dim normalizado por texto;
    /// slice vazio retorna `Vec::new()`.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // Com 1 texto não há padding a fazer — delega para embed()
        if texts.len() == 1 {
            return Ok(vec![self.embed(&texts[0])?]);
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let batch_size = encodings.len();
        let mut all_ids = vec![0u32; batch_size * max_len];
        let all_type_ids = vec![0u32; batch_size * max_len];
        let mut all_mask = vec![0u32; batch_size * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();
            let offset = i * max_len;
            for (j, &id) in ids.iter().enumerate() {
                all_ids[offset + j] = id;
                all_mask[offset + j] = mask[j];
            }
        }

        let input_ids =
            Tensor::from_vec(all_ids, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(all_type_ids, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(all_mask, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // ─── Mean Pooling (batch) ─────────────────────────────────
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(output.shape())?;

        let masked = (output * mask_expanded.clone())?;
        let summed = masked.sum(1)?;
        let mask_sum = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / mask_sum)?;

        // ─── L2 Normalize (batch) ─────────────────────────────────
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        let mut results = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let emb: Vec<f32> = normalized.get(i)?.to_vec1()?;
            results.push(emb);
        }

        Ok(results)
    }
}

impl SemanticEncoder for Embedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

/// Constrói um tokenizer WordPiece BERT a partir de `vocab.txt`.
///
/// Usado como fallback quando o repositório não possui `tokenizer.json`.
/// O parâmetro `lowercase` acompanha o checkpoint: `false` para modelos
/// cased (o embedder francês), `true` para uncased (o de sentimento).
pub(super) fn build_bert_tokenizer(vocab_path: &str, lowercase: bool) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    let wordpiece = WordPiece::from_file(vocab_path)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::new(
        true,  // clean_text: remove caracteres de controle
        true,  // handle_chinese_chars: adiciona espaços ao redor
        None,  // strip_accents: comportamento padrão do checkpoint
        lowercase,
    )));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    tokenizer.with_post_processor(Some(BertProcessing::new(
        ("[SEP]".to_string(), 102), // Token separador (ID 102)
        ("[CLS]".to_string(), 101), // Token classificador (ID 101)
    )));

    Ok(tokenizer)
}
