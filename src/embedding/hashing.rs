//! Deterministic token-hash embedding provider.
//!
//! Each lower-cased alphanumeric token is hashed (FNV-1a) into one of
//! [`EMBEDDING_DIM`] buckets with a hash-derived sign, then the vector is
//! L2-normalized. Texts sharing words land close together, which is enough
//! for offline use and for exercising ranking in tests.

use anyhow::Result;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Default, Clone)]
pub struct HashingEmbeddingProvider;

impl HashingEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        let lowered = text.to_lowercase();
        let mut any = false;

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % EMBEDDING_DIM as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
            any = true;
        }

        // Punctuation-only or empty input still needs a non-zero direction.
        if !any {
            let bucket = (fnv1a(text.as_bytes()) % EMBEDDING_DIM as u64) as usize;
            v[bucket] = 1.0;
        }

        l2_normalize(&v)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn model_id(&self) -> &str {
        "hashing-384"
    }
}
