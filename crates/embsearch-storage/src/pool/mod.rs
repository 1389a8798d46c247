//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::Path;

use embsearch_core::errors::EmbsearchResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// The single write connection plus the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: ReadPool,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    pub fn open(path: &Path, read_pool_size: usize) -> EmbsearchResult<Self> {
        Ok(Self {
            writer: WriteConnection::open(path)?,
            readers: ReadPool::open(path, read_pool_size)?,
        })
    }

    /// Open an in-memory connection pool (for testing). In-memory mode
    /// uses separate databases for writer and readers, so readers won't
    /// see the writer's changes; route reads through the writer instead.
    pub fn open_in_memory(read_pool_size: usize) -> EmbsearchResult<Self> {
        Ok(Self {
            writer: WriteConnection::open_in_memory()?,
            readers: ReadPool::open_in_memory(read_pool_size)?,
        })
    }
}
