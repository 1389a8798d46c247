//! # embsearch
//!
//! Multi-model semantic entity search. Documents are split into named
//! textual datapoints grouped under entities; each datapoint is embedded
//! per model; a query is embedded the same way and compared to every
//! stored vector by cosine similarity; per-datapoint and per-entity
//! scores are combined through pluggable probability-combination methods
//! into a ranked entity list.
//!
//! This crate is the thin public façade wiring the storage layer, the
//! embedding client, and the scoring engine together, and routing every
//! mutation through its searchdomain's cache-revalidation policy.

pub mod payload;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use embsearch_core::errors::SearchError;
use embsearch_core::models::MutationKind;
use embsearch_search::SearchEngine;
use embsearch_storage::StorageEngine;

pub use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
pub use embsearch_core::models::{
    Attribute, Datapoint, DatapointSpec, Entity, ScoredEntity, SearchdomainSettings, Searchresult,
};
pub use embsearch_core::probmethods::Probmethods;
pub use embsearch_core::traits::IEmbeddingProvider;
pub use embsearch_core::EmbsearchConfig;
pub use embsearch_embeddings::{HashedProvider, HttpEmbeddingClient};
pub use embsearch_search::{CancelFlag, QueryOptions, Searchdomain};

/// The engine façade: storage + embedding provider + scoring engine +
/// a registry of live searchdomain handles.
pub struct Embsearch {
    storage: StorageEngine,
    engine: SearchEngine,
    provider: Arc<dyn IEmbeddingProvider>,
    probmethods: Arc<Probmethods>,
    domains: DashMap<String, Arc<Searchdomain>>,
    query_defaults: QueryOptions,
}

impl Embsearch {
    /// Open the engine with the built-in probmethods.
    pub fn open(
        config: &EmbsearchConfig,
        provider: Arc<dyn IEmbeddingProvider>,
    ) -> EmbsearchResult<Self> {
        Self::open_with_probmethods(config, provider, Probmethods::with_builtins())
    }

    /// Open the engine with a caller-extended probmethod registry.
    pub fn open_with_probmethods(
        config: &EmbsearchConfig,
        provider: Arc<dyn IEmbeddingProvider>,
        probmethods: Probmethods,
    ) -> EmbsearchResult<Self> {
        let storage = match &config.storage.path {
            Some(path) => StorageEngine::open(path, config.storage.read_pool_size)?,
            None => StorageEngine::open_in_memory()?,
        };
        let probmethods = Arc::new(probmethods);
        let engine = SearchEngine::new(
            provider.clone(),
            probmethods.clone(),
            config.embedding.query_cache_size,
        );
        info!(provider = provider.name(), "embsearch opened");
        Ok(Self {
            storage,
            engine,
            provider,
            probmethods,
            domains: DashMap::new(),
            query_defaults: QueryOptions {
                parallel: config.search.parallel,
                timeout: config.search.query_timeout_secs.map(std::time::Duration::from_secs),
                ..Default::default()
            },
        })
    }

    /// Direct access to the storage engine (ingestion tooling).
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    // --- Searchdomains ---

    /// Create a searchdomain. An existing one under the same name is a
    /// conflict.
    pub fn searchdomain_create(
        &self,
        name: &str,
        settings: SearchdomainSettings,
    ) -> EmbsearchResult<Arc<Searchdomain>> {
        let record = self.storage.searchdomain_create(name, &settings)?;
        let handle = Arc::new(Searchdomain::new(record));
        self.domains.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Get a searchdomain handle, optionally creating the domain with
    /// default settings when it does not exist yet.
    pub fn searchdomain_get(
        &self,
        name: &str,
        create_if_missing: bool,
    ) -> EmbsearchResult<Arc<Searchdomain>> {
        if let Some(handle) = self.domains.get(name) {
            return Ok(handle.clone());
        }
        match self.storage.searchdomain_get(name)? {
            Some(record) => {
                let handle = Arc::new(Searchdomain::new(record));
                self.domains.insert(name.to_string(), handle.clone());
                Ok(handle)
            }
            None if create_if_missing => {
                self.searchdomain_create(name, SearchdomainSettings::default())
            }
            None => Err(EmbsearchError::not_found("searchdomain", name)),
        }
    }

    /// Names of every persisted searchdomain.
    pub fn searchdomain_list(&self) -> EmbsearchResult<Vec<String>> {
        Ok(self
            .storage
            .searchdomain_get_all()?
            .into_iter()
            .map(|record| record.name)
            .collect())
    }

    /// Delete a searchdomain; entities cascade. Returns whether it existed.
    pub fn searchdomain_delete(&self, name: &str) -> EmbsearchResult<bool> {
        let Some(record) = self.storage.searchdomain_get(name)? else {
            return Ok(false);
        };
        let deleted = self.storage.searchdomain_delete(record.id)?;
        self.domains.remove(name);
        Ok(deleted)
    }

    /// Rename a searchdomain. The handle is rebuilt lazily; its caches
    /// start invalid under the new name.
    pub fn searchdomain_update_name(&self, name: &str, new_name: &str) -> EmbsearchResult<()> {
        let domain = self.searchdomain_get(name, false)?;
        if self.storage.searchdomain_get(new_name)?.is_some() {
            return Err(EmbsearchError::Conflict {
                reason: format!("searchdomain '{new_name}' already exists"),
            });
        }
        self.storage.searchdomain_update_name(domain.id(), new_name)?;
        self.domains.remove(name);
        Ok(())
    }

    /// Update one settings key. The value is validated at ingress; the
    /// full record is rewritten with bound parameters.
    pub fn searchdomain_update_setting(
        &self,
        name: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> EmbsearchResult<()> {
        let domain = self.searchdomain_get(name, false)?;
        let mut settings = domain.settings()?;
        settings.set(key, value)?;
        self.storage
            .searchdomain_update_settings(domain.id(), &settings)?;
        let cache_maxentries = settings.cache_maxentries;
        domain.set_settings(settings)?;
        domain.search_cache.trim_to(cache_maxentries)?;
        Ok(())
    }

    // --- Entities ---

    /// Upsert an entity: a prior entity under the same name is replaced,
    /// cascade included. Probmethod names are checked before any write.
    pub fn entity_insert(
        &self,
        searchdomain: &str,
        name: &str,
        probmethod: &str,
        attributes: &[(String, String)],
        datapoints: &[DatapointSpec],
    ) -> EmbsearchResult<Entity> {
        self.check_probmethod(probmethod)?;
        for spec in datapoints {
            self.check_probmethod(&spec.probmethod_embedding)?;
        }
        let domain = self.searchdomain_get(searchdomain, false)?;
        let entity = self.storage.entity_insert(
            domain.id(),
            name,
            probmethod,
            attributes,
            datapoints,
            &*self.provider,
        )?;
        domain.apply_mutation(MutationKind::EntityAdd)?;
        Ok(entity)
    }

    /// Delete an entity by name. Returns whether it existed.
    pub fn entity_delete(&self, searchdomain: &str, name: &str) -> EmbsearchResult<bool> {
        let domain = self.searchdomain_get(searchdomain, false)?;
        let deleted = self.storage.entity_delete(domain.id(), name)?;
        if deleted {
            domain.apply_mutation(MutationKind::EntityRemove)?;
        }
        Ok(deleted)
    }

    /// Every entity of a searchdomain, served from the entity cache
    /// (refilled when invalid).
    pub fn entity_list(&self, searchdomain: &str) -> EmbsearchResult<Vec<Entity>> {
        let domain = self.searchdomain_get(searchdomain, false)?;
        let snapshot = domain
            .entity_cache
            .snapshot(|| self.storage.entity_get_all(domain.id()))?;
        Ok(snapshot.as_ref().clone())
    }

    /// One entity by name, filtered from the cached snapshot.
    pub fn entity_get_by_name(
        &self,
        searchdomain: &str,
        name: &str,
    ) -> EmbsearchResult<Option<Entity>> {
        let domain = self.searchdomain_get(searchdomain, false)?;
        let snapshot = domain
            .entity_cache
            .snapshot(|| self.storage.entity_get_all(domain.id()))?;
        Ok(snapshot.iter().find(|entity| entity.name == name).cloned())
    }

    /// Rank every entity of a searchdomain against a query text.
    pub fn entity_query(
        &self,
        searchdomain: &str,
        text: &str,
        limit_results: Option<usize>,
    ) -> EmbsearchResult<Vec<ScoredEntity>> {
        let options = QueryOptions {
            limit_results,
            ..self.query_defaults.clone()
        };
        self.entity_query_with_options(searchdomain, text, &options)
    }

    /// Rank with explicit per-query options (cancellation, timeout,
    /// parallelism).
    pub fn entity_query_with_options(
        &self,
        searchdomain: &str,
        text: &str,
        options: &QueryOptions,
    ) -> EmbsearchResult<Vec<ScoredEntity>> {
        let domain = self.searchdomain_get(searchdomain, false)?;
        self.engine.query(&self.storage, &domain, text, options)
    }

    // --- Datapoints and attributes ---

    /// Add a datapoint to an existing entity.
    pub fn entity_insert_datapoint(
        &self,
        searchdomain: &str,
        entity_name: &str,
        spec: &DatapointSpec,
    ) -> EmbsearchResult<()> {
        self.check_probmethod(&spec.probmethod_embedding)?;
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        self.storage
            .entity_insert_datapoint(entity.id, spec, &*self.provider)?;
        domain.apply_mutation(MutationKind::DatapointCreate)?;
        Ok(())
    }

    /// Re-embed a datapoint's text, optionally clearing vectors for
    /// models outside the list.
    pub fn datapoint_update_embeddings(
        &self,
        searchdomain: &str,
        entity_name: &str,
        datapoint_name: &str,
        text: &str,
        models: &[String],
        clear_embeddings: bool,
    ) -> EmbsearchResult<()> {
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let datapoint = find_datapoint(&entity, datapoint_name)?;
        self.storage.datapoint_update_embeddings(
            datapoint.id,
            text,
            models,
            clear_embeddings,
            &*self.provider,
        )?;
        domain.apply_mutation(MutationKind::EmbeddingUpdate)?;
        Ok(())
    }

    pub fn entity_delete_datapoint(
        &self,
        searchdomain: &str,
        entity_name: &str,
        datapoint_name: &str,
    ) -> EmbsearchResult<bool> {
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let datapoint = find_datapoint(&entity, datapoint_name)?;
        let deleted = self.storage.entity_delete_datapoint(datapoint.id)?;
        if deleted {
            domain.apply_mutation(MutationKind::DatapointRemove)?;
        }
        Ok(deleted)
    }

    pub fn entity_update_datapoint_name(
        &self,
        searchdomain: &str,
        entity_name: &str,
        datapoint_name: &str,
        new_name: &str,
    ) -> EmbsearchResult<bool> {
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let datapoint = find_datapoint(&entity, datapoint_name)?;
        let updated = self
            .storage
            .entity_update_datapoint_name(datapoint.id, new_name)?;
        if updated {
            domain.apply_mutation(MutationKind::DatapointUpdate)?;
        }
        Ok(updated)
    }

    pub fn entity_update_datapoint_probmethod(
        &self,
        searchdomain: &str,
        entity_name: &str,
        datapoint_name: &str,
        new_probmethod: &str,
    ) -> EmbsearchResult<bool> {
        self.check_probmethod(new_probmethod)?;
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let datapoint = find_datapoint(&entity, datapoint_name)?;
        let updated = self
            .storage
            .entity_update_datapoint_probmethod(datapoint.id, new_probmethod)?;
        if updated {
            domain.apply_mutation(MutationKind::DatapointUpdate)?;
        }
        Ok(updated)
    }

    /// Update (or create) an attribute. Attributes are provenance
    /// metadata and never affect scores, so only the entity cache is
    /// refreshed.
    pub fn entity_update_attribute(
        &self,
        searchdomain: &str,
        entity_name: &str,
        attribute: &str,
        value: &str,
    ) -> EmbsearchResult<bool> {
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let updated = self
            .storage
            .entity_update_attribute(entity.id, attribute, value, true)?;
        domain.entity_cache.invalidate();
        Ok(updated)
    }

    pub fn entity_delete_attribute(
        &self,
        searchdomain: &str,
        entity_name: &str,
        attribute: &str,
    ) -> EmbsearchResult<bool> {
        let (domain, entity) = self.resolve_entity(searchdomain, entity_name)?;
        let deleted = self
            .storage
            .entity_delete_attribute(entity.id, attribute)?;
        if deleted {
            domain.entity_cache.invalidate();
        }
        Ok(deleted)
    }

    // --- Internals ---

    fn resolve_entity(
        &self,
        searchdomain: &str,
        entity_name: &str,
    ) -> EmbsearchResult<(Arc<Searchdomain>, Entity)> {
        let domain = self.searchdomain_get(searchdomain, false)?;
        let snapshot = domain
            .entity_cache
            .snapshot(|| self.storage.entity_get_all(domain.id()))?;
        let entity = snapshot
            .iter()
            .find(|entity| entity.name == entity_name)
            .cloned()
            .ok_or_else(|| EmbsearchError::not_found("entity", entity_name))?;
        Ok((domain, entity))
    }

    fn check_probmethod(&self, spec: &str) -> EmbsearchResult<()> {
        if self.probmethods.contains(spec) {
            return Ok(());
        }
        let name = spec.split_once(':').map(|(n, _)| n).unwrap_or(spec);
        Err(SearchError::UnknownProbmethod {
            name: name.to_string(),
        }
        .into())
    }
}

fn find_datapoint<'a>(entity: &'a Entity, datapoint_name: &str) -> EmbsearchResult<&'a Datapoint> {
    entity
        .datapoints
        .iter()
        .find(|datapoint| datapoint.name == datapoint_name)
        .ok_or_else(|| EmbsearchError::not_found("datapoint", datapoint_name))
}
