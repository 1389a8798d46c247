//! Per-query model-embedding memo.
//!
//! During one scan the query text is fixed, so each model's query-side
//! embedding is computed at most once (per racing worker) and shared.
//! The memo lives exactly as long as its query.

use std::sync::Arc;

use dashmap::DashMap;

use embsearch_core::errors::EmbsearchResult;
use embsearch_core::traits::IEmbeddingProvider;

use crate::cache::QueryEmbeddingCache;

/// Concurrent map from model name to the query's embedding for that model.
pub struct QueryMemo {
    entries: DashMap<String, Arc<Vec<f32>>>,
}

impl QueryMemo {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Resolve the query embedding for `model`: memo, then the L1 cache,
    /// then the provider. The embed call runs outside any map lock;
    /// racing workers may both compute, and the last write wins — the
    /// provider is deterministic for a given (model, text).
    pub fn get_or_embed(
        &self,
        model: &str,
        text: &str,
        provider: &dyn IEmbeddingProvider,
        l1: &QueryEmbeddingCache,
    ) -> EmbsearchResult<Arc<Vec<f32>>> {
        if let Some(hit) = self.entries.get(model) {
            return Ok(hit.clone());
        }
        if let Some(hit) = l1.get(model, text) {
            self.entries.insert(model.to_string(), hit.clone());
            return Ok(hit);
        }
        let embedding = Arc::new(provider.embed(model, text)?);
        l1.insert(model, text, embedding.clone());
        self.entries.insert(model.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Number of models memoized so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryMemo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl IEmbeddingProvider for CountingProvider {
        fn embed(&self, _model: &str, _text: &str) -> EmbsearchResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn memo_embeds_once_per_model() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let l1 = QueryEmbeddingCache::new(16);
        let memo = QueryMemo::new();

        for _ in 0..5 {
            memo.get_or_embed("m1", "query", &provider, &l1).unwrap();
        }
        memo.get_or_embed("m2", "query", &provider, &l1).unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn fresh_memo_reuses_l1() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let l1 = QueryEmbeddingCache::new(16);

        QueryMemo::new()
            .get_or_embed("m1", "query", &provider, &l1)
            .unwrap();
        // A second query allocates a fresh memo but hits the L1.
        QueryMemo::new()
            .get_or_embed("m1", "query", &provider, &l1)
            .unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
