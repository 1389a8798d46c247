use serde::{Deserialize, Serialize};

/// Search-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Shard the entity scan across worker threads. The single-threaded
    /// path produces identical output and exists for deterministic tests.
    pub parallel: bool,
    /// Whole-query timeout (seconds). `None` disables the deadline.
    pub query_timeout_secs: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            query_timeout_secs: None,
        }
    }
}
