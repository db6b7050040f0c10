//! Schema migration chain
//!
//! Each [`MigrationStrategy`] is a pure transformation of the raw JSON value
//! from one schema version to a newer one. A [`MigrationChain`] applies steps
//! until the value reaches the current version.

use serde_json::{json, Value};
use tracing::debug;

use crate::error::MigrationError;
use crate::snapshot::{CURRENT_VERSION, MIN_SUPPORTED_VERSION};

/// One schema upgrade step
#[derive(Debug, Clone, Copy)]
pub struct MigrationStrategy {
    pub from_version: u32,
    pub to_version: u32,
    pub description: &'static str,
    pub migrate: fn(Value) -> Value,
}

/// Ordered set of upgrade steps towards a target version
#[derive(Debug, Clone)]
pub struct MigrationChain {
    steps: Vec<MigrationStrategy>,
    current_version: u32,
    min_supported_version: u32,
}

impl MigrationChain {
    pub fn new(current_version: u32, min_supported_version: u32) -> Self {
        Self {
            steps: Vec::new(),
            current_version,
            min_supported_version,
        }
    }

    /// Steps shipped with this build
    pub fn standard() -> Self {
        Self::new(CURRENT_VERSION, MIN_SUPPORTED_VERSION).with_step(MigrationStrategy {
            from_version: 1,
            to_version: 2,
            description: "add uiState with layout defaults",
            migrate: add_ui_state,
        })
    }

    pub fn with_step(mut self, step: MigrationStrategy) -> Self {
        self.register(step);
        self
    }

    pub fn register(&mut self, step: MigrationStrategy) {
        self.steps.push(step);
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn min_supported_version(&self) -> u32 {
        self.min_supported_version
    }

    pub fn steps(&self) -> &[MigrationStrategy] {
        &self.steps
    }

    /// Read the numeric `version` field of a raw blob
    pub fn stored_version(value: &Value) -> Result<u32, MigrationError> {
        value
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(MigrationError::MissingVersion)
    }

    /// Upgrade a raw blob to the current version
    pub fn migrate(&self, mut value: Value) -> Result<Value, MigrationError> {
        let mut version = Self::stored_version(&value)?;
        self.check_supported(version)?;

        while version < self.current_version {
            let step = self.next_step(version)?;
            value = (step.migrate)(value);
            if let Some(object) = value.as_object_mut() {
                object.insert("version".to_string(), json!(step.to_version));
            }
            debug!(
                from = step.from_version,
                to = step.to_version,
                "Applied migration: {}",
                step.description
            );
            version = step.to_version;
        }

        Ok(value)
    }

    /// Check that every supported version has a path to the current one
    pub fn verify(&self) -> Result<(), MigrationError> {
        for start in self.min_supported_version..self.current_version {
            let mut version = start;
            while version < self.current_version {
                version = self.next_step(version)?.to_version;
            }
        }
        Ok(())
    }

    fn check_supported(&self, version: u32) -> Result<(), MigrationError> {
        if version < self.min_supported_version || version > self.current_version {
            return Err(MigrationError::UnsupportedVersion {
                version,
                min: self.min_supported_version,
                max: self.current_version,
            });
        }
        Ok(())
    }

    fn next_step(&self, version: u32) -> Result<&MigrationStrategy, MigrationError> {
        self.steps
            .iter()
            .find(|step| step.from_version == version && step.to_version > version)
            .ok_or(MigrationError::MigrationGap {
                from: version,
                target: self.current_version,
            })
    }
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self::standard()
    }
}

// v1 blobs predate the layout section.
fn add_ui_state(mut value: Value) -> Value {
    if let Some(object) = value.as_object_mut() {
        object
            .entry("uiState")
            .or_insert_with(|| json!({ "sidebarWidth": 400, "showPerformanceMetrics": false }));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_blob() -> Value {
        json!({
            "version": 1,
            "timestamp": "2024-03-01T12:00:00Z",
            "expandedKeys": [1, 2],
            "selectedAssetId": 2,
            "navigationHistory": [1, 2],
            "currentPosition": 1,
            "viewPreferences": { "viewMode": "tree", "sortBy": "name", "sortOrder": "asc" }
        })
    }

    #[test]
    fn test_standard_chain_is_connected() {
        assert_eq!(MigrationChain::standard().verify(), Ok(()));
    }

    #[test]
    fn test_v1_gains_ui_state_defaults() {
        let migrated = MigrationChain::standard().migrate(v1_blob()).unwrap();

        assert_eq!(migrated["version"], 2);
        assert_eq!(migrated["uiState"]["sidebarWidth"], 400);
        assert_eq!(migrated["uiState"]["showPerformanceMetrics"], false);
        assert_eq!(migrated["expandedKeys"], json!([1, 2]));
    }

    #[test]
    fn test_existing_ui_state_is_kept() {
        let mut blob = v1_blob();
        blob["uiState"] = json!({ "sidebarWidth": 250, "showPerformanceMetrics": true });
        let migrated = MigrationChain::standard().migrate(blob).unwrap();
        assert_eq!(migrated["uiState"]["sidebarWidth"], 250);
    }

    #[test]
    fn test_current_version_passes_through() {
        let blob = json!({ "version": 2, "expandedKeys": [] });
        assert_eq!(MigrationChain::standard().migrate(blob.clone()).unwrap(), blob);
    }

    #[test]
    fn test_newer_and_older_versions_are_unsupported() {
        let chain = MigrationChain::standard();
        assert_eq!(
            chain.migrate(json!({ "version": 3 })),
            Err(MigrationError::UnsupportedVersion { version: 3, min: 1, max: 2 })
        );
        assert!(matches!(
            chain.migrate(json!({ "version": 0 })),
            Err(MigrationError::UnsupportedVersion { version: 0, .. })
        ));
    }

    #[test]
    fn test_missing_version() {
        let chain = MigrationChain::standard();
        assert_eq!(chain.migrate(json!({ "version": "2" })), Err(MigrationError::MissingVersion));
        assert_eq!(chain.migrate(json!([])), Err(MigrationError::MissingVersion));
    }

    #[test]
    fn test_gap_is_detected() {
        let chain = MigrationChain::new(3, 1).with_step(MigrationStrategy {
            from_version: 1,
            to_version: 2,
            description: "noop",
            migrate: |v| v,
        });

        assert_eq!(chain.verify(), Err(MigrationError::MigrationGap { from: 2, target: 3 }));
        assert_eq!(
            chain.migrate(json!({ "version": 1 })),
            Err(MigrationError::MigrationGap { from: 2, target: 3 })
        );
    }
}
