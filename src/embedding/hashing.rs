// src/embedding/hashing.rs
//! Offline providers: a deterministic hashing embedder for tests/local runs, and a
//! disabled provider that always reports the service as unavailable.

use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::EmbeddingError;

pub const DEFAULT_HASHING_DIMENSION: usize = 256;

/// Bag-of-words feature hashing: each lower-cased token adds ±1 to one bucket,
/// then the vector is L2-normalized. Identical texts map to identical vectors and
/// texts sharing most tokens land close together.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = vec![0f32; self.dimension];
        let mut seen = 0usize;
        for tok in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(tok.to_lowercase().as_bytes());
            let mut idx_bytes = [0u8; 8];
            idx_bytes.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(idx_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
            seen += 1;
        }
        if seen == 0 {
            return Err(EmbeddingError::Malformed("no tokens to embed".to_string()));
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

/// Always unavailable; every relevance/uniqueness signal falls back to heuristics.
#[derive(Debug, Clone, Default)]
pub struct DisabledEmbeddingProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for DisabledEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
