mod embedding_error;
mod embsearch_error;
mod search_error;
mod storage_error;

pub use embedding_error::EmbeddingError;
pub use embsearch_error::{EmbsearchError, EmbsearchResult};
pub use search_error::SearchError;
pub use storage_error::StorageError;
