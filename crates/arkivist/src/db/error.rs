//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored status string no longer maps to a known variant.
    #[error("Corrupt status value '{value}' in column {column}")]
    CorruptStatus { column: &'static str, value: String },

    /// A stored embedding blob has an invalid length.
    #[error("Corrupt embedding blob: {0} bytes is not a whole number of f32 values")]
    CorruptVector(usize),

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
