use crate::errors::EmbsearchResult;

/// Embedding generation provider. One text in, one vector out, per model.
///
/// Implementations must be shareable across parallel workers: either
/// stateless or internally synchronized.
pub trait IEmbeddingProvider: Send + Sync {
    /// Embed a single text with the given model.
    fn embed(&self, model: &str, text: &str) -> EmbsearchResult<Vec<f32>>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
