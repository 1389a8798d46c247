//! Per-searchdomain search cache: query text → previously computed
//! ranked results, bounded by `cache_maxentries` with LRU eviction on
//! `last_access_date`.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
use embsearch_core::models::{ScoredEntity, Searchresult};

/// Bounded mapping from literal query text to its ranked result list.
#[derive(Debug)]
pub struct SearchCache {
    entries: RwLock<HashMap<String, Searchresult>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a query. A hit bumps `last_access_date`.
    pub fn get(&self, query: &str) -> EmbsearchResult<Option<Vec<ScoredEntity>>> {
        let mut guard = self
            .entries
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        Ok(guard.get_mut(query).map(|entry| {
            entry.touch();
            entry.results.clone()
        }))
    }

    /// Insert a result, keeping the cache within `max_entries` by
    /// evicting the least-recently-accessed entry when full.
    pub fn insert(&self, result: Searchresult, max_entries: usize) -> EmbsearchResult<()> {
        if max_entries == 0 {
            return Ok(());
        }
        let mut guard = self
            .entries
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        if !guard.contains_key(&result.query) {
            Self::evict_to(&mut guard, max_entries.saturating_sub(1));
        }
        guard.insert(result.query.clone(), result);
        Ok(())
    }

    /// Shrink the cache to at most `max_entries`, dropping the
    /// least-recently-accessed results first. Used when the cap is
    /// lowered at runtime.
    pub fn trim_to(&self, max_entries: usize) -> EmbsearchResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        Self::evict_to(&mut guard, max_entries);
        Ok(())
    }

    fn evict_to(entries: &mut HashMap<String, Searchresult>, max_entries: usize) {
        while entries.len() > max_entries {
            let oldest = entries
                .values()
                .min_by_key(|entry| entry.last_access_date)
                .map(|entry| entry.query.clone());
            match oldest {
                Some(query) => {
                    debug!(query = %query, "evicting least-recently-accessed search result");
                    entries.remove(&query);
                }
                None => break,
            }
        }
    }

    /// Drop every cached result.
    pub fn clear(&self) -> EmbsearchResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        guard.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}
