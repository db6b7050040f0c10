//! Key/value blob storage backends

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::StorageError;

/// Durable string storage keyed by name
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Read a blob; `None` when the key is absent
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite a blob
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a blob; returns whether it existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Process-local storage, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStateStorage {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl StateStorage for MemoryStateStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.blobs.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.write().remove(key).is_some())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStateStorage {
    directory: PathBuf,
}

impl FileStateStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.directory.join(format!("{}.json", key)))
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey { key: key.to_string() })
    }
}

#[async_trait]
impl StateStorage for FileStateStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.directory).await?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, value).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        trace!(path = %path.display(), bytes = value.len(), "Wrote state file");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
