//! Deterministic hashed-bucket embedding provider.
//!
//! Hashes terms into fixed-dimension buckets, weighted by term frequency,
//! L2-normalized. The model name is folded into the hash so distinct
//! models produce distinct vector spaces. No network, no state: the same
//! (model, text) always yields the same vector, which makes this the
//! provider of choice for tests and air-gapped fallback.

use std::collections::HashMap;

use embsearch_core::errors::EmbsearchResult;
use embsearch_core::traits::IEmbeddingProvider;

/// Hashed term-frequency embedding provider.
pub struct HashedProvider {
    dimensions: usize,
}

impl HashedProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Hash a term into a bucket index using FNV-1a, seeded by the model name.
    fn hash_term(model: &str, term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in model.as_bytes().iter().chain([0x1fu8].iter()).chain(term.as_bytes()) {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h as usize) % dims
    }

    /// Tokenize text into lowercase alphanumeric terms.
    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }

    fn vector(&self, model: &str, text: &str) -> Vec<f32> {
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; self.dimensions];
        }

        let mut tf: HashMap<String, f32> = HashMap::new();
        for tok in &tokens {
            *tf.entry(tok.clone()).or_default() += 1.0;
        }

        let total = tokens.len() as f32;
        let mut vec = vec![0.0f32; self.dimensions];
        for (term, count) in &tf {
            let bucket = Self::hash_term(model, term, self.dimensions);
            vec[bucket] += count / total;
        }

        // L2 normalize.
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }

        vec
    }
}

impl IEmbeddingProvider for HashedProvider {
    fn embed(&self, model: &str, text: &str) -> EmbsearchResult<Vec<f32>> {
        Ok(self.vector(model, text))
    }

    fn name(&self) -> &str {
        "hashed-provider"
    }
}
