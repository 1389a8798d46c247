use serde::{Deserialize, Serialize};

use super::defaults;

/// Storage subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. `None` selects an in-memory database.
    pub path: Option<std::path::PathBuf>,
    /// Number of read-only connections in the read pool.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
        }
    }
}
