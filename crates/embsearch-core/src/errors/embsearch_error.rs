use super::{EmbeddingError, SearchError, StorageError};

/// Top-level error type for the embsearch engine.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum EmbsearchError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("bad settings: {reason}")]
    BadSettings { reason: String },

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("embedding service error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("search error: {0}")]
    SearchError(#[from] SearchError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}

/// Convenience type alias.
pub type EmbsearchResult<T> = Result<T, EmbsearchError>;

impl EmbsearchError {
    /// Shorthand for a `NotFound` over a named record kind.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
