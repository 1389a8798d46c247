use serde::{Deserialize, Serialize};

use super::defaults;

/// Embedding-client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the remote model server.
    pub base_url: String,
    /// Per-call request timeout (seconds). An embed timeout fails the query.
    pub request_timeout_secs: u64,
    /// Capacity of the cross-query L1 query-embedding cache.
    pub query_cache_size: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_EMBEDDING_BASE_URL.to_string(),
            request_timeout_secs: defaults::DEFAULT_EMBED_TIMEOUT_SECS,
            query_cache_size: defaults::DEFAULT_QUERY_CACHE_SIZE,
        }
    }
}
