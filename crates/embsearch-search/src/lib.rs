//! # embsearch-search
//!
//! The query side of the engine: per-searchdomain runtime handles with
//! their entity and search caches, and the two-level score-aggregation
//! pipeline that shards entities across workers.

pub mod domain;
pub mod engine;
pub mod entity_cache;
pub mod search_cache;

pub use domain::Searchdomain;
pub use engine::{CancelFlag, QueryOptions, SearchEngine};
pub use entity_cache::EntityCache;
pub use search_cache::SearchCache;
