//! Cross-query L1 cache for query-side embeddings.
//!
//! Keyed by `blake3(model ‖ 0x1f ‖ text)`. Embedding models are
//! deterministic for a given (model, text), so reuse across queries is
//! safe; only successful embeds are cached.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

/// L1 in-memory cache mapping (model, text) to the computed embedding.
pub struct QueryEmbeddingCache {
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl QueryEmbeddingCache {
    /// Create a cache with the given max entry count.
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(Duration::from_secs(3600))
            .build();
        Self { cache }
    }

    fn key(model: &str, text: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(model.as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Look up the embedding for (model, text).
    pub fn get(&self, model: &str, text: &str) -> Option<Arc<Vec<f32>>> {
        self.cache.get(&Self::key(model, text))
    }

    /// Insert the embedding for (model, text).
    pub fn insert(&self, model: &str, text: &str, embedding: Arc<Vec<f32>>) {
        self.cache.insert(Self::key(model, text), embedding);
    }

    /// Invalidate all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = QueryEmbeddingCache::new(16);
        let vec = Arc::new(vec![1.0f32, 2.0]);
        cache.insert("m1", "hello", vec.clone());
        assert_eq!(cache.get("m1", "hello"), Some(vec));
    }

    #[test]
    fn keys_are_model_scoped() {
        let cache = QueryEmbeddingCache::new(16);
        cache.insert("m1", "hello", Arc::new(vec![1.0]));
        assert!(cache.get("m2", "hello").is_none());
    }

    #[test]
    fn separator_prevents_key_collisions() {
        assert_ne!(
            QueryEmbeddingCache::key("ab", "c"),
            QueryEmbeddingCache::key("a", "bc")
        );
    }
}
