//! # embsearch-storage
//!
//! SQLite persistence layer for the embsearch engine.
//! Single write connection + read pool (WAL mode), versioned migrations,
//! and the four-query entity hydration path. Every statement binds its
//! parameters; no SQL is assembled from caller strings.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use embsearch_core::errors::StorageError;

/// Helper to convert a string message into an `EmbsearchError::StorageError`.
pub fn to_storage_err(msg: String) -> embsearch_core::EmbsearchError {
    embsearch_core::EmbsearchError::StorageError(StorageError::SqliteError { message: msg })
}
