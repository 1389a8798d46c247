//! # embsearch-embeddings
//!
//! Talking to the remote embedding model server, plus the two cache
//! layers in front of it: a cross-query L1 keyed by (model, text) and
//! the per-query model-embedding memo shared by scan workers.

pub mod cache;
pub mod client;
pub mod hashed;
pub mod memo;

pub use cache::QueryEmbeddingCache;
pub use client::HttpEmbeddingClient;
pub use hashed::HashedProvider;
pub use memo::QueryMemo;
