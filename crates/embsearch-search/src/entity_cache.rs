//! Per-searchdomain entity cache: a shared snapshot of the hydrated
//! entity list behind an invalidation flag.
//!
//! The flag is stored with Release and read with Acquire so a write
//! that invalidates happens-before any read observing the new state.
//! Readers racing a write may see the pre- or post-state, never a torn
//! one: the snapshot is swapped as a whole `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
use embsearch_core::models::Entity;

/// Cached hydrated entity list plus its invalidation flag.
#[derive(Debug)]
pub struct EntityCache {
    entries: RwLock<Arc<Vec<Entity>>>,
    /// Starts true: the cache must be filled before first use.
    invalid: AtomicBool,
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            invalid: AtomicBool::new(true),
        }
    }

    /// Mark the cache stale. The next read refills before answering.
    pub fn invalidate(&self) {
        self.invalid.store(true, Ordering::Release);
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    /// Return the current snapshot, refilling through `refill` first if
    /// the cache is invalid. Refill is an all-or-nothing replacement: on
    /// error the previous snapshot and the invalid flag are untouched.
    pub fn snapshot<F>(&self, refill: F) -> EmbsearchResult<Arc<Vec<Entity>>>
    where
        F: FnOnce() -> EmbsearchResult<Vec<Entity>>,
    {
        if !self.is_invalid() {
            let guard = self
                .entries
                .read()
                .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
            return Ok(guard.clone());
        }

        let fresh = Arc::new(refill()?);
        debug!(entities = fresh.len(), "entity cache refilled");
        let mut guard = self
            .entries
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        *guard = fresh.clone();
        self.invalid.store(false, Ordering::Release);
        Ok(fresh)
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: i64, name: &str) -> Entity {
        Entity {
            id,
            name: name.to_string(),
            probmethod: "wavg".to_string(),
            searchdomain_id: 1,
            attributes: Vec::new(),
            datapoints: Vec::new(),
        }
    }

    #[test]
    fn starts_invalid_and_refills_once() {
        let cache = EntityCache::new();
        assert!(cache.is_invalid());

        let mut refills = 0;
        let snapshot = cache
            .snapshot(|| {
                refills += 1;
                Ok(vec![entity(1, "a")])
            })
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!cache.is_invalid());

        // Valid cache answers without refilling.
        let snapshot = cache
            .snapshot(|| {
                refills += 1;
                Ok(vec![])
            })
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(refills, 1);
    }

    #[test]
    fn invalidate_forces_refill() {
        let cache = EntityCache::new();
        cache.snapshot(|| Ok(vec![entity(1, "a")])).unwrap();
        cache.invalidate();
        let snapshot = cache
            .snapshot(|| Ok(vec![entity(1, "a"), entity(2, "b")]))
            .unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn failed_refill_leaves_cache_invalid() {
        let cache = EntityCache::new();
        cache.snapshot(|| Ok(vec![entity(1, "a")])).unwrap();
        cache.invalidate();

        let err = cache.snapshot(|| {
            Err(embsearch_core::EmbsearchError::ConcurrencyError(
                "boom".to_string(),
            ))
        });
        assert!(err.is_err());
        assert!(cache.is_invalid());

        // Old snapshot still intact once refill succeeds again.
        let snapshot = cache.snapshot(|| Ok(vec![entity(3, "c")])).unwrap();
        assert_eq!(snapshot[0].id, 3);
    }
}
