//! Persistence manager
//!
//! Saves bounded snapshots of the tree view state, restores them through the
//! migration chain, and keeps overlapping saves ordered by sequence number.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use assettree_common::format_error;
use assettree_state::TreeViewState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{MigrationError, PersistenceError, Result};
use crate::migration::MigrationChain;
use crate::snapshot::{ExportEnvelope, PersistedTreeState, CURRENT_VERSION};
use crate::storage::StateStorage;
use crate::validation::validate_structure;

/// Newest history entries kept in a snapshot
pub const MAX_HISTORY_SIZE: usize = 100;
/// Largest blob accepted by `save_state`
pub const MAX_STORAGE_SIZE: usize = 1024 * 1024;
/// History length used when a snapshot is over the size limit
pub const TRIMMED_HISTORY_SIZE: usize = 20;
/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "assettree-state";
/// Load plus migration must finish within this to count as optimal
pub const RESTORATION_TARGET_MS: f64 = 500.0;

/// Persistence tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub storage_key: String,
    pub max_history_size: usize,
    pub max_storage_size: usize,
    pub trimmed_history_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_history_size: MAX_HISTORY_SIZE,
            max_storage_size: MAX_STORAGE_SIZE,
            trimmed_history_size: TRIMMED_HISTORY_SIZE,
        }
    }
}

/// What `save_state` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written {
        sequence: u64,
        bytes: usize,
        /// History was cut to fit the size limit
        trimmed: bool,
    },
    /// A newer snapshot was already written
    SkippedStale { sequence: u64, acknowledged: u64 },
}

/// Summary of the stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub has_persisted_state: bool,
    pub size_bytes: usize,
    pub last_saved: Option<DateTime<Utc>>,
    pub version: Option<u32>,
    pub storage_key: String,
}

/// Timing of one restore
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationTiming {
    /// Read and parse
    pub load_time_ms: f64,
    /// Migrate, validate and decode
    pub migration_time_ms: f64,
    pub total_time_ms: f64,
    pub state_found: bool,
    pub is_optimal: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHeader {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Saves, loads, migrates and exports tree view state
pub struct PersistenceManager {
    storage: Arc<dyn StateStorage>,
    config: PersistenceConfig,
    chain: MigrationChain,
    last_issued: AtomicU64,
    acknowledged: AtomicU64,
    write_gate: Mutex<()>,
}

impl PersistenceManager {
    pub fn new(storage: Arc<dyn StateStorage>, config: PersistenceConfig) -> Self {
        Self::with_chain(storage, config, MigrationChain::standard())
    }

    pub fn with_chain(storage: Arc<dyn StateStorage>, config: PersistenceConfig, chain: MigrationChain) -> Self {
        Self {
            storage,
            config,
            chain,
            last_issued: AtomicU64::new(0),
            acknowledged: AtomicU64::new(0),
            write_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn storage_key(&self) -> &str {
        &self.config.storage_key
    }

    pub fn quarantine_key(&self) -> String {
        format!("{}.quarantine", self.config.storage_key)
    }

    /// Sequence of the newest snapshot known to be written
    pub fn acknowledged_sequence(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Persist a snapshot of `state`.
    ///
    /// Snapshots over the size limit are retried once with a shorter history
    /// and rejected if still too large; the stored blob is then untouched.
    pub async fn save_state(&self, state: &TreeViewState) -> Result<SaveOutcome> {
        let key = self.storage_key();
        let sequence = self.last_issued.fetch_add(1, Ordering::SeqCst) + 1;

        let mut snapshot = PersistedTreeState::capture(state, sequence, self.config.max_history_size);
        let mut json = serde_json::to_string(&snapshot)?;
        let mut trimmed = false;

        if json.len() > self.config.max_storage_size {
            warn!(
                key,
                size = json.len(),
                limit = self.config.max_storage_size,
                "State over size limit; trimming navigation history"
            );
            snapshot.trim_history(self.config.trimmed_history_size);
            json = serde_json::to_string(&snapshot)?;
            trimmed = true;

            if json.len() > self.config.max_storage_size {
                let err = PersistenceError::StateTooLarge {
                    key: key.to_string(),
                    size: json.len(),
                    limit: self.config.max_storage_size,
                };
                error!(key, size = json.len(), "Rejected state save: {}", err);
                return Err(err);
            }
        }

        let _gate = self.write_gate.lock().await;
        let acknowledged = self.acknowledged.load(Ordering::SeqCst);
        if sequence <= acknowledged {
            debug!(key, sequence, acknowledged, "Skipped stale state snapshot");
            return Ok(SaveOutcome::SkippedStale { sequence, acknowledged });
        }

        if let Err(e) = self.storage.write(key, &json).await {
            error!(key, backend = self.storage.name(), "Failed to save state: {}", format_error(&e));
            return Err(PersistenceError::storage(key, e));
        }
        self.acknowledged.store(sequence, Ordering::SeqCst);

        debug!(key, sequence, bytes = json.len(), trimmed, "Saved tree state");
        Ok(SaveOutcome::Written {
            sequence,
            bytes: json.len(),
            trimmed,
        })
    }

    /// Load the stored snapshot, upgraded to the current version.
    ///
    /// Returns `None` when nothing usable is stored. Corrupted blobs are
    /// cleared; blobs from unsupported versions are quarantined.
    pub async fn load_state(&self) -> Option<PersistedTreeState> {
        let key = self.storage_key();
        let raw = match self.storage.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, backend = self.storage.name(), "Failed to read stored state: {}", format_error(&e));
                return None;
            }
        };

        match self.decode(&raw) {
            Ok(snapshot) => {
                self.last_issued.fetch_max(snapshot.sequence, Ordering::SeqCst);
                let acknowledged = self.acknowledged_sequence();
                if snapshot.sequence < acknowledged {
                    debug!(
                        key,
                        stored = snapshot.sequence,
                        acknowledged,
                        "Discarded stored state older than the last acknowledged write"
                    );
                    return None;
                }
                debug!(key, version = snapshot.version, bytes = raw.len(), "Loaded tree state");
                Some(snapshot)
            }
            Err(PersistenceError::Migration(e)) => {
                self.quarantine(&raw, &e).await;
                None
            }
            Err(e) => {
                warn!(key, bytes = raw.len(), "Discarding stored state: {}", format_error(&e));
                if let Err(e) = self.clear_state().await {
                    error!(key, "Failed to clear corrupted state: {}", format_error(&e));
                }
                None
            }
        }
    }

    /// Delete the stored blob; returns whether one existed
    pub async fn clear_state(&self) -> Result<bool> {
        let key = self.storage_key();
        let removed = self
            .storage
            .remove(key)
            .await
            .map_err(|e| PersistenceError::storage(key, e))?;
        if removed {
            info!(key, "Cleared stored tree state");
        }
        Ok(removed)
    }

    /// Stored state wrapped in an export envelope; `None` when nothing is stored
    pub async fn export_state(&self) -> Result<Option<String>> {
        let Some(snapshot) = self.load_state().await else {
            return Ok(None);
        };
        let envelope = ExportEnvelope {
            exported_at: Utc::now(),
            version: CURRENT_VERSION,
            state: serde_json::to_value(&snapshot)?,
        };
        Ok(Some(serde_json::to_string_pretty(&envelope)?))
    }

    /// Import an export envelope and save it as the current state
    pub async fn import_state(&self, json: &str) -> Result<TreeViewState> {
        let envelope: ExportEnvelope =
            serde_json::from_str(json).map_err(|e| PersistenceError::InvalidExport(e.to_string()))?;

        let snapshot = self.decode_value(envelope.state)?;
        let state = snapshot.to_view_state();
        self.save_state(&state).await?;

        info!(
            key = self.storage_key(),
            exported_at = %envelope.exported_at,
            version = envelope.version,
            "Imported tree state"
        );
        Ok(state)
    }

    /// Describe the stored blob without fully decoding it
    pub async fn get_storage_info(&self) -> Result<StorageInfo> {
        let key = self.storage_key();
        let raw = self
            .storage
            .read(key)
            .await
            .map_err(|e| PersistenceError::storage(key, e))?;

        let mut info = StorageInfo {
            has_persisted_state: raw.is_some(),
            size_bytes: 0,
            last_saved: None,
            version: None,
            storage_key: key.to_string(),
        };
        if let Some(raw) = raw {
            info.size_bytes = raw.len();
            if let Ok(header) = serde_json::from_str::<StoredHeader>(&raw) {
                info.version = header.version;
                info.last_saved = header.timestamp;
            }
        }
        Ok(info)
    }

    /// Time a full restore without touching the live state
    pub async fn measure_restoration_speed(&self) -> Result<RestorationTiming> {
        let key = self.storage_key();
        let start = Instant::now();

        let raw = self
            .storage
            .read(key)
            .await
            .map_err(|e| PersistenceError::storage(key, e))?;
        let value = raw.map(|raw| serde_json::from_str::<Value>(&raw)).transpose()?;
        let load_time_ms = elapsed_ms(start);

        let migration_start = Instant::now();
        let state_found = match value {
            Some(value) => {
                self.decode_value(value)?;
                true
            }
            None => false,
        };
        let migration_time_ms = elapsed_ms(migration_start);

        let total_time_ms = load_time_ms + migration_time_ms;
        let timing = RestorationTiming {
            load_time_ms,
            migration_time_ms,
            total_time_ms,
            state_found,
            is_optimal: total_time_ms < RESTORATION_TARGET_MS,
        };
        debug!(key, total_ms = total_time_ms, optimal = timing.is_optimal, "Measured restoration speed");
        Ok(timing)
    }

    fn decode(&self, raw: &str) -> Result<PersistedTreeState> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| PersistenceError::corrupted(self.storage_key(), e.to_string()))?;
        self.decode_value(value)
    }

    fn decode_value(&self, value: Value) -> Result<PersistedTreeState> {
        let key = self.storage_key();
        let migrated = match self.chain.migrate(value) {
            Ok(migrated) => migrated,
            Err(MigrationError::MissingVersion) => {
                return Err(PersistenceError::corrupted(key, MigrationError::MissingVersion.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        validate_structure(&migrated).map_err(|reason| PersistenceError::corrupted(key, reason))?;
        serde_json::from_value(migrated).map_err(|e| PersistenceError::corrupted(key, e.to_string()))
    }

    async fn quarantine(&self, raw: &str, reason: &MigrationError) {
        let key = self.storage_key();
        let quarantine_key = self.quarantine_key();
        warn!(key, quarantine = %quarantine_key, bytes = raw.len(), "Quarantining unmigratable state: {}", reason);

        if let Err(e) = self.storage.write(&quarantine_key, raw).await {
            error!(key, "Failed to quarantine state; leaving it in place: {}", format_error(&e));
            return;
        }
        if let Err(e) = self.storage.remove(key).await {
            error!(key, "Failed to remove quarantined state: {}", format_error(&e));
        }
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("backend", &self.storage.name())
            .field("config", &self.config)
            .field("acknowledged", &self.acknowledged_sequence())
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
