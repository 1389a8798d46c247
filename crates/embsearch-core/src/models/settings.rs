//! Searchdomain settings: the search-cache cap and the six per-mutation
//! cache-revalidation policies. Serialized as a JSON object stored inline
//! with the searchdomain row.

use serde::{Deserialize, Serialize};

use crate::errors::{EmbsearchError, EmbsearchResult};

fn default_cache_maxentries() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

/// Per-searchdomain settings. Missing keys on load take the documented
/// defaults; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchdomainSettings {
    #[serde(default = "default_cache_maxentries")]
    pub cache_maxentries: usize,
    #[serde(default = "default_true")]
    pub cache_revalidation_entity_add: bool,
    #[serde(default = "default_true")]
    pub cache_revalidation_entity_remove: bool,
    #[serde(default = "default_true")]
    pub cache_revalidation_embedding_update: bool,
    #[serde(default = "default_true")]
    pub cache_revalidation_datapoint_create: bool,
    #[serde(default = "default_true")]
    pub cache_revalidation_datapoint_update: bool,
    #[serde(default = "default_true")]
    pub cache_revalidation_datapoint_remove: bool,
}

impl Default for SearchdomainSettings {
    fn default() -> Self {
        Self {
            cache_maxentries: default_cache_maxentries(),
            cache_revalidation_entity_add: true,
            cache_revalidation_entity_remove: true,
            cache_revalidation_embedding_update: true,
            cache_revalidation_datapoint_create: true,
            cache_revalidation_datapoint_update: true,
            cache_revalidation_datapoint_remove: true,
        }
    }
}

/// The mutation kinds a revalidation policy can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    EntityAdd,
    EntityRemove,
    EmbeddingUpdate,
    DatapointCreate,
    DatapointUpdate,
    DatapointRemove,
}

impl SearchdomainSettings {
    /// Serialize to the JSON form stored in the searchdomain row.
    pub fn to_json(&self) -> EmbsearchResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the stored JSON form. Missing keys default; unknown
    /// keys are ignored. Callers loading from storage fall back to
    /// defaults on malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether a mutation of the given kind invalidates this domain's caches.
    pub fn revalidates(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::EntityAdd => self.cache_revalidation_entity_add,
            MutationKind::EntityRemove => self.cache_revalidation_entity_remove,
            MutationKind::EmbeddingUpdate => self.cache_revalidation_embedding_update,
            MutationKind::DatapointCreate => self.cache_revalidation_datapoint_create,
            MutationKind::DatapointUpdate => self.cache_revalidation_datapoint_update,
            MutationKind::DatapointRemove => self.cache_revalidation_datapoint_remove,
        }
    }

    /// Apply a single keyed update, validating key name and value type.
    /// Wrong key or wrong type is rejected; defaults are never silently
    /// substituted on this path.
    pub fn set(&mut self, key: &str, value: &serde_json::Value) -> EmbsearchResult<()> {
        match key {
            "cache_maxentries" => {
                let n = value.as_u64().ok_or_else(|| EmbsearchError::BadSettings {
                    reason: format!("cache_maxentries must be a positive integer, got {value}"),
                })?;
                if n == 0 {
                    return Err(EmbsearchError::BadSettings {
                        reason: "cache_maxentries must be positive".to_string(),
                    });
                }
                self.cache_maxentries = n as usize;
            }
            _ => {
                let flag = value.as_bool().ok_or_else(|| EmbsearchError::BadSettings {
                    reason: format!("{key} must be a boolean, got {value}"),
                })?;
                match key {
                    "cache_revalidation_entity_add" => self.cache_revalidation_entity_add = flag,
                    "cache_revalidation_entity_remove" => {
                        self.cache_revalidation_entity_remove = flag
                    }
                    "cache_revalidation_embedding_update" => {
                        self.cache_revalidation_embedding_update = flag
                    }
                    "cache_revalidation_datapoint_create" => {
                        self.cache_revalidation_datapoint_create = flag
                    }
                    "cache_revalidation_datapoint_update" => {
                        self.cache_revalidation_datapoint_update = flag
                    }
                    "cache_revalidation_datapoint_remove" => {
                        self.cache_revalidation_datapoint_remove = flag
                    }
                    _ => {
                        return Err(EmbsearchError::BadSettings {
                            reason: format!("unknown setting: {key}"),
                        })
                    }
                }
            }
        }
        Ok(())
    }
}
