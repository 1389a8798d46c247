/// Query-pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("unknown probmethod: {name}")]
    UnknownProbmethod { name: String },

    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("query cancelled")]
    Cancelled,

    #[error("query timed out after {elapsed_ms}ms")]
    QueryTimeout { elapsed_ms: u128 },
}
