//! SearchEngine: the two-level score-aggregation pipeline.
//!
//! query → search-cache lookup → entity-cache snapshot (refilling from
//! storage when invalid) → shard entities across workers → per-embedding
//! cosine → per-datapoint reduction (scores named by model) → per-entity
//! reduction (scores named by datapoint) → merge, sort, cache, return.
//!
//! Workers never touch storage: they score a read-only snapshot, and the
//! only structure they mutate is the per-query model-embedding memo.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use embsearch_core::codec;
use embsearch_core::errors::{EmbsearchResult, SearchError};
use embsearch_core::models::{Entity, ScoredEntity, Searchresult};
use embsearch_core::probmethods::Probmethods;
use embsearch_core::traits::IEmbeddingProvider;
use embsearch_embeddings::{QueryEmbeddingCache, QueryMemo};
use embsearch_storage::StorageEngine;

use crate::domain::Searchdomain;

/// Cooperative cancellation signal, checked between entities.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-query knobs.
#[derive(Clone)]
pub struct QueryOptions {
    /// Truncate the returned ranking (the full ranking is still cached).
    pub limit_results: Option<usize>,
    /// Shard across workers; the single-threaded path produces
    /// identical output and exists for deterministic tests.
    pub parallel: bool,
    pub cancel: CancelFlag,
    /// Whole-query deadline, checked between entities.
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit_results: None,
            parallel: true,
            cancel: CancelFlag::new(),
            timeout: None,
        }
    }
}

/// The scoring engine. Shared across searchdomains; all per-domain state
/// lives in the `Searchdomain` handle.
pub struct SearchEngine {
    provider: Arc<dyn IEmbeddingProvider>,
    probmethods: Arc<Probmethods>,
    query_cache: QueryEmbeddingCache,
}

impl SearchEngine {
    pub fn new(
        provider: Arc<dyn IEmbeddingProvider>,
        probmethods: Arc<Probmethods>,
        query_cache_size: u64,
    ) -> Self {
        Self {
            provider,
            probmethods,
            query_cache: QueryEmbeddingCache::new(query_cache_size),
        }
    }

    /// Run a query against one searchdomain.
    pub fn query(
        &self,
        storage: &StorageEngine,
        domain: &Searchdomain,
        text: &str,
        options: &QueryOptions,
    ) -> EmbsearchResult<Vec<ScoredEntity>> {
        if let Some(hit) = domain.search_cache.get(text)? {
            debug!(searchdomain = %domain.name(), query = %text, "search cache hit");
            return Ok(truncate(hit, options.limit_results));
        }

        let started = Instant::now();
        let deadline = options.timeout.map(|t| started + t);

        // The coordinator refills the entity cache; workers only ever
        // see the finished snapshot.
        let entities = domain
            .entity_cache
            .snapshot(|| storage.entity_get_all(domain.id()))?;

        // One memo per query: each model's query embedding is computed
        // at most once per racing worker and shared from then on.
        let memo = QueryMemo::new();

        let mut scored = if options.parallel {
            self.score_sharded(&entities, text, &memo, options, started, deadline)?
        } else {
            self.score_shard(&entities, text, &memo, options, started, deadline)?
        };

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        debug!(
            searchdomain = %domain.name(),
            query = %text,
            entities = scored.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query scored"
        );

        domain.search_cache.insert(
            Searchresult::new(text, scored.clone()),
            domain.settings()?.cache_maxentries,
        )?;

        Ok(truncate(scored, options.limit_results))
    }

    /// Partition the snapshot into roughly equal shards, one per worker.
    fn score_sharded(
        &self,
        entities: &[Entity],
        text: &str,
        memo: &QueryMemo,
        options: &QueryOptions,
        started: Instant,
        deadline: Option<Instant>,
    ) -> EmbsearchResult<Vec<ScoredEntity>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let workers = rayon::current_num_threads().max(1);
        let shard_size = entities.len().div_ceil(workers);
        let shards: Vec<Vec<ScoredEntity>> = entities
            .par_chunks(shard_size)
            .map(|shard| self.score_shard(shard, text, memo, options, started, deadline))
            .collect::<EmbsearchResult<_>>()?;
        Ok(shards.into_iter().flatten().collect())
    }

    /// Score one shard of entities sequentially. Cancellation and the
    /// deadline are observed between entities.
    fn score_shard(
        &self,
        shard: &[Entity],
        text: &str,
        memo: &QueryMemo,
        options: &QueryOptions,
        started: Instant,
        deadline: Option<Instant>,
    ) -> EmbsearchResult<Vec<ScoredEntity>> {
        let mut scored = Vec::with_capacity(shard.len());
        for entity in shard {
            if options.cancel.is_cancelled() {
                return Err(SearchError::Cancelled.into());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(SearchError::QueryTimeout {
                    elapsed_ms: started.elapsed().as_millis(),
                }
                .into());
            }
            scored.push(self.score_entity(entity, text, memo)?);
        }
        Ok(scored)
    }

    /// Score one entity: cosine per stored embedding, reduced per
    /// datapoint over model names, then per entity over datapoint names.
    fn score_entity(
        &self,
        entity: &Entity,
        text: &str,
        memo: &QueryMemo,
    ) -> EmbsearchResult<ScoredEntity> {
        let mut datapoint_scores: Vec<(&str, f64)> = Vec::with_capacity(entity.datapoints.len());
        for datapoint in &entity.datapoints {
            let mut model_scores: Vec<(&str, f64)> =
                Vec::with_capacity(datapoint.embeddings.len());
            for stored in &datapoint.embeddings {
                let query_vector =
                    memo.get_or_embed(&stored.model, text, &*self.provider, &self.query_cache)?;
                let stored_vector = codec::unpack(&stored.bytes)?;
                let similarity = codec::cosine(&query_vector, &stored_vector)?;
                model_scores.push((stored.model.as_str(), similarity));
            }
            let datapoint_score = self
                .probmethods
                .combine(&datapoint.probmethod_embedding, &model_scores)?;
            datapoint_scores.push((datapoint.name.as_str(), datapoint_score));
        }
        let entity_score = self.probmethods.combine(&entity.probmethod, &datapoint_scores)?;
        Ok(ScoredEntity {
            entity_id: entity.id,
            name: entity.name.clone(),
            score: entity_score,
        })
    }
}

fn truncate(mut results: Vec<ScoredEntity>, limit: Option<usize>) -> Vec<ScoredEntity> {
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    results
}
