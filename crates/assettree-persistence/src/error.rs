//! Persistence error types

use thiserror::Error;

/// Failures of a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key '{key}': only [A-Za-z0-9._-] are allowed")]
    InvalidKey { key: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Schema migration failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Stored state has no numeric version")]
    MissingVersion,

    /// Older than the oldest supported schema or newer than the current one
    #[error("Unsupported state version {version} (supported {min}..={max})")]
    UnsupportedVersion { version: u32, min: u32, max: u32 },

    /// No registered step leaves this version
    #[error("No migration registered from version {from} towards {target}")]
    MigrationGap { from: u32, target: u32 },
}

/// Errors surfaced by the persistence manager
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage unavailable for '{key}': {source}")]
    StorageUnavailable {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Stored state for '{key}' is corrupted: {reason}")]
    StateCorrupted { key: String, reason: String },

    #[error("State for '{key}' is {size} bytes, over the {limit} byte limit")]
    StateTooLarge { key: String, size: usize, limit: usize },

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid export: {0}")]
    InvalidExport(String),
}

impl PersistenceError {
    pub(crate) fn storage(key: &str, source: StorageError) -> Self {
        Self::StorageUnavailable {
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn corrupted(key: &str, reason: impl Into<String>) -> Self {
        Self::StateCorrupted {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;
