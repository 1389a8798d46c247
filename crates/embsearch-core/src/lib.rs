//! # embsearch-core
//!
//! Foundation crate for the embsearch engine.
//! Defines the data model, errors, config, the packed-vector codec,
//! and the probability-combination registry.
//! Every other crate in the workspace depends on this.

pub mod codec;
pub mod config;
pub mod errors;
pub mod models;
pub mod probmethods;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::EmbsearchConfig;
pub use errors::{EmbsearchError, EmbsearchResult};
pub use models::{
    Attribute, Datapoint, DatapointSpec, Entity, MutationKind, ScoredEntity, SearchdomainRecord,
    SearchdomainSettings, Searchresult, StoredEmbedding,
};
pub use probmethods::Probmethods;
