//! The single write connection. All mutations are serialised through it.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use embsearch_core::errors::{EmbsearchError, EmbsearchResult, StorageError};

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// The writer: one mutex-guarded connection.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the write connection for the given database path.
    pub fn open(path: &Path) -> EmbsearchResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory write connection (for testing).
    pub fn open_in_memory() -> EmbsearchResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with exclusive access to the write connection.
    pub fn with_conn_sync<F, T>(&self, f: F) -> EmbsearchResult<T>
    where
        F: FnOnce(&Connection) -> EmbsearchResult<T>,
    {
        let guard = self.conn.lock().map_err(|e| {
            EmbsearchError::StorageError(StorageError::LockPoisoned {
                message: e.to_string(),
            })
        })?;
        f(&guard)
    }
}
