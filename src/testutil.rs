//! Backends determinísticos para os testes do engine.
//!
//! Os traits de `nlu` existem justamente para que os testes rodem sem
//! baixar modelos: aqui ficam encoders com saída fixa ou derivada do
//! texto, e analisadores de sentimento stub.

use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;

use crate::nlu::{SemanticEncoder, SentimentAnalyzer};

/// Encoder com vetores fixos por texto — para fixtures de empate e score
/// controlado. Texto fora do mapa vira vetor zero (cosseno 0).
///
/// As chaves devem estar em lowercase: o matcher normaliza antes de
/// chamar o encoder.
pub struct StubEncoder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StubEncoder {
    /// Cria o stub a partir de pares `(texto, vetor)`.
    pub fn new(entries: &[(&str, &[f32])]) -> Self {
        let vectors = entries
            .iter()
            .map(|(text, vector)| (text.to_string(), vector.to_vec()))
            .collect();
        Self { vectors }
    }
}

impl SemanticEncoder for StubEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| vec![0.0; 2]))
    }
}

/// Encoder bag-of-words — determinístico e bom o bastante para as
/// fixtures francesas de ponta a ponta: textos idênticos pontuam 1.0 e
/// textos sem tokens em comum pontuam exatamente 0.
///
/// Cada token inédito ganha a próxima dimensão livre do vetor (sem
/// hashing, logo sem colisões), via um vocabulário interno que cresce
/// conforme os textos chegam.
pub struct BagOfWordsEncoder {
    /// Dimensão fixa dos vetores produzidos.
    dims: usize,
    /// Vocabulário token → dimensão, preenchido na ordem de chegada.
    vocab: Mutex<HashMap<String, usize>>,
}

impl Default for BagOfWordsEncoder {
    fn default() -> Self {
        Self {
            dims: 4096,
            vocab: Mutex::new(HashMap::new()),
        }
    }
}

impl SemanticEncoder for BagOfWordsEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];
        let mut vocab = self.vocab.lock();
        for token in text.split_whitespace() {
            let next = vocab.len();
            let index = *vocab.entry(token.to_string()).or_insert(next);
            if index < self.dims {
                vector[index] += 1.0;
            }
        }
        Ok(vector)
    }
}

/// Analisador de sentimento que devolve sempre o mesmo rótulo.
pub struct FixedSentiment(pub &'static str);

impl SentimentAnalyzer for FixedSentiment {
    fn classify(&self, _text: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Analisador de sentimento que sempre falha — para testar a propagação
/// de erros de backend como erro de requisição.
pub struct FailingSentiment;

impl SentimentAnalyzer for FailingSentiment {
    fn classify(&self, _text: &str) -> Result<String> {
        anyhow::bail!("sentiment backend unavailable")
    }
}
