/// Errors talking to the remote embedding service.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embed request for model '{model}' failed: {reason}")]
    RequestFailed { model: String, reason: String },

    #[error("embedding service returned no embedding for model '{model}'")]
    MissingEmbedding { model: String },

    #[error("embed request for model '{model}' timed out after {seconds}s")]
    Timeout { model: String, seconds: u64 },
}
