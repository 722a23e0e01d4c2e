//! Error types for the pin/photo store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or create the database file.
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// Failed to run a database migration.
    #[error("database migration failed: {0}")]
    Migration(#[from] rusqlite::Error),

    /// A transactional read or write failed to commit.
    #[error("database query failed: {0}")]
    Query(String),

    /// A write addressed a key whose record no longer exists. Callers decide
    /// whether to ignore (e.g. a download racing a delete) or surface it.
    #[error("no {entity} with key {key}")]
    NotFound { entity: &'static str, key: i64 },

    /// Rejected write that would leave a photo with an empty image blob.
    #[error("refusing to store an empty image blob")]
    EmptyImage,

    /// The on-disk schema is newer than this build understands.
    #[error("database schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

impl StoreError {
    /// Create a Query error from a rusqlite error.
    pub fn query(source: rusqlite::Error) -> Self {
        Self::Query(source.to_string())
    }

    pub(crate) fn pin_not_found(key: i64) -> Self {
        Self::NotFound {
            entity: "pin",
            key,
        }
    }

    pub(crate) fn photo_not_found(key: i64) -> Self {
        Self::NotFound {
            entity: "photo",
            key,
        }
    }
}
