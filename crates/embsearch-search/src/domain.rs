//! Runtime handle for one searchdomain: the persisted record plus the
//! in-memory caches. Caches are never persisted and are lost on restart.

use std::sync::RwLock;

use tracing::debug;

use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
use embsearch_core::models::{MutationKind, SearchdomainRecord, SearchdomainSettings};

use crate::entity_cache::EntityCache;
use crate::search_cache::SearchCache;

/// A named, isolated index: settings plus entity and search caches.
#[derive(Debug)]
pub struct Searchdomain {
    id: i64,
    name: String,
    settings: RwLock<SearchdomainSettings>,
    pub entity_cache: EntityCache,
    pub search_cache: SearchCache,
}

impl Searchdomain {
    pub fn new(record: SearchdomainRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            settings: RwLock::new(record.settings),
            entity_cache: EntityCache::new(),
            search_cache: SearchCache::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> EmbsearchResult<SearchdomainSettings> {
        Ok(self
            .settings
            .read()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?
            .clone())
    }

    /// Replace the in-memory settings (the caller persists separately).
    pub fn set_settings(&self, settings: SearchdomainSettings) -> EmbsearchResult<()> {
        let mut guard = self
            .settings
            .write()
            .map_err(|e| EmbsearchError::ConcurrencyError(e.to_string()))?;
        *guard = settings;
        Ok(())
    }

    /// Apply the revalidation policy for one mutation kind: when the
    /// matching flag is set, the entity cache is invalidated and the
    /// search cache cleared. Returns whether invalidation happened.
    pub fn apply_mutation(&self, kind: MutationKind) -> EmbsearchResult<bool> {
        if !self.settings()?.revalidates(kind) {
            return Ok(false);
        }
        debug!(searchdomain = %self.name, ?kind, "invalidating caches");
        self.entity_cache.invalidate();
        self.search_cache.clear()?;
        Ok(true)
    }
}
