//! Default values shared by the config structs.

/// Read connections kept alongside the single writer.
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// Base URL of the embedding model server.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:11434";

/// Per-call timeout for remote embed requests (seconds).
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

/// Cross-query L1 cache capacity for query embeddings.
pub const DEFAULT_QUERY_CACHE_SIZE: u64 = 2048;
