//! Durable storage for the asset tree view state
//!
//! - [`PersistenceManager`]: save, load, clear, export/import and diagnostics
//! - [`StateStorage`]: async blob storage seam with memory and file backends
//! - [`MigrationChain`]: schema upgrades from older stored versions
//! - [`PersistedTreeState`]: the versioned blob and its conversions

pub mod error;
pub mod manager;
pub mod migration;
pub mod snapshot;
pub mod storage;
pub mod validation;

pub use error::{MigrationError, PersistenceError, Result, StorageError};
pub use manager::{
    PersistenceConfig, PersistenceManager, RestorationTiming, SaveOutcome, StorageInfo,
    DEFAULT_STORAGE_KEY, MAX_HISTORY_SIZE, MAX_STORAGE_SIZE, TRIMMED_HISTORY_SIZE,
};
pub use migration::{MigrationChain, MigrationStrategy};
pub use snapshot::{
    ExportEnvelope, PersistedTreeState, UiState, ViewPreferences, CURRENT_VERSION,
    MIN_SUPPORTED_VERSION,
};
pub use storage::{FileStateStorage, MemoryStateStorage, StateStorage};
