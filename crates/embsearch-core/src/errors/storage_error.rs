/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("stored embedding blob is corrupt: {len} bytes is not a whole number of f32s")]
    CorruptEmbedding { len: usize },

    #[error("connection lock poisoned: {message}")]
    LockPoisoned { message: String },
}
