//! Configuration loading
//!
//! Configuration is read from a TOML, YAML or JSON file (format chosen by
//! extension), then overridden by `ASSETTREE_*` environment variables, then
//! validated. Every field has a default, so an empty file is valid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assettree_common::validation::collect_errors;
use assettree_common::{LogLevel, LogOptions, RangeValidator, Validatable, ValidationError};
use assettree_performance::PerformanceThresholds;
use assettree_persistence::{FileStateStorage, MemoryStateStorage, PersistenceConfig, StateStorage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "ASSETTREE_";

const AUTOSAVE_DELAY_MS: RangeValidator<u64> = RangeValidator::new("autosave_delay_ms", 0, 60_000);
const SEARCH_CACHE_CAPACITY: RangeValidator<usize> =
    RangeValidator::new("search_cache_capacity", 1, 100_000);
const MAX_STORAGE_SIZE: RangeValidator<usize> =
    RangeValidator::new("persistence.max_storage_size", 1024, 64 * 1024 * 1024);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Unsupported config format for {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

/// Where state blobs are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Defaults to the platform data directory
    pub directory: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_storage_dir)
    }

    /// Backend described by these settings
    pub fn open(&self) -> Arc<dyn StateStorage> {
        match self.backend {
            StorageBackend::File => Arc::new(FileStateStorage::new(self.resolved_directory())),
            StorageBackend::Memory => Arc::new(MemoryStateStorage::new()),
        }
    }
}

/// `<data dir>/assettree`, or `./assettree` where the platform has none
pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("assettree")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub ansi: bool,
    /// Extra filter directives, e.g. `assettree_persistence=trace`
    pub directives: Vec<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default().as_str().to_string(),
            ansi: true,
            directives: Vec::new(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTreeConfig {
    pub storage: StorageSettings,
    pub persistence: PersistenceConfig,
    /// Quiet period before a changed state is saved
    pub autosave_delay_ms: u64,
    pub performance: PerformanceThresholds,
    pub search_cache_capacity: usize,
    pub logging: LoggingSettings,
}

impl Default for AssetTreeConfig {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            persistence: PersistenceConfig::default(),
            autosave_delay_ms: 300,
            performance: PerformanceThresholds::default(),
            search_cache_capacity: 256,
            logging: LoggingSettings::default(),
        }
    }
}

impl AssetTreeConfig {
    /// Defaults or `path`, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file; the format follows the extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_str(&content, format, path)
    }

    pub fn load_from_str(content: &str, format: ConfigFormat, path: &Path) -> Result<Self, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format: format.name(),
            message,
        };
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string())),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Apply `ASSETTREE_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) {
        let overrides: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| key.strip_prefix(ENV_PREFIX).map(|k| (k.to_string(), value)))
            .collect();
        self.apply_overrides(&overrides);
    }

    /// Apply overrides keyed by the variable name without its prefix.
    ///
    /// Unknown keys are ignored; unparsable values are logged and skipped.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            match key.as_str() {
                "STORAGE_BACKEND" => match value.to_ascii_lowercase().as_str() {
                    "file" => self.storage.backend = StorageBackend::File,
                    "memory" => self.storage.backend = StorageBackend::Memory,
                    _ => warn_unparsable(key, value),
                },
                "STORAGE_DIR" => self.storage.directory = Some(PathBuf::from(value)),
                "STORAGE_KEY" => self.persistence.storage_key = value.clone(),
                "MAX_HISTORY_SIZE" => set_parsed(&mut self.persistence.max_history_size, key, value),
                "MAX_STORAGE_SIZE" => set_parsed(&mut self.persistence.max_storage_size, key, value),
                "AUTOSAVE_DELAY_MS" => set_parsed(&mut self.autosave_delay_ms, key, value),
                "SEARCH_CACHE_CAPACITY" => set_parsed(&mut self.search_cache_capacity, key, value),
                "RENDER_BUDGET_MS" => set_parsed(&mut self.performance.render_budget_ms, key, value),
                "LOG_LEVEL" => self.logging.level = value.clone(),
                _ => {}
            }
        }
    }

    /// Logging options for [`assettree_common::logging::init`]
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            level: LogLevel::parse(&self.logging.level).unwrap_or_default(),
            ansi: self.logging.ansi,
            directives: self.logging.directives.clone(),
        }
    }

    pub fn autosave_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.autosave_delay_ms)
    }
}

impl Validatable for AssetTreeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let persistence = &self.persistence;
        collect_errors(vec![
            AUTOSAVE_DELAY_MS.check(self.autosave_delay_ms).map(drop),
            SEARCH_CACHE_CAPACITY.check(self.search_cache_capacity).map(drop),
            MAX_STORAGE_SIZE.check(persistence.max_storage_size).map(drop),
            check_storage_key(&persistence.storage_key),
            check_history_sizes(persistence),
            check_log_level(&self.logging.level),
        ])
    }
}

fn check_storage_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "persistence.storage_key".to_string(),
            message: format!("'{}' may only contain [A-Za-z0-9._-]", key),
        })
    }
}

fn check_history_sizes(persistence: &PersistenceConfig) -> Result<(), ValidationError> {
    if persistence.max_history_size == 0 {
        return Err(ValidationError::InvalidValue {
            field: "persistence.max_history_size".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if persistence.trimmed_history_size > persistence.max_history_size {
        return Err(ValidationError::InvalidValue {
            field: "persistence.trimmed_history_size".to_string(),
            message: format!(
                "{} exceeds max_history_size {}",
                persistence.trimmed_history_size, persistence.max_history_size
            ),
        });
    }
    Ok(())
}

fn check_log_level(level: &str) -> Result<(), ValidationError> {
    match LogLevel::parse(level) {
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidValue {
            field: "logging.level".to_string(),
            message: format!("unknown level '{}'", level),
        }),
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn_unparsable(key, value),
    }
}

fn warn_unparsable(key: &str, value: &str) {
    warn!(variable = %format!("{}{}", ENV_PREFIX, key), value, "Ignoring unparsable environment override");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AssetTreeConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.autosave_delay_ms, 300);
        assert_eq!(config.persistence.storage_key, "assettree-state");
        assert!(config.storage.resolved_directory().ends_with("assettree"));
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assettree.toml");
        std::fs::write(
            &path,
            r#"
autosave_delay_ms = 150

[storage]
backend = "memory"

[persistence]
storage_key = "plant-a"

[performance]
render_budget_ms = 8.0
"#,
        )
        .unwrap();

        let config = AssetTreeConfig::load_from_file(&path).unwrap();
        assert_eq!(config.autosave_delay_ms, 150);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.persistence.storage_key, "plant-a");
        assert_eq!(config.persistence.max_history_size, 100);
        assert_eq!(config.performance.render_budget_ms, 8.0);
        assert_eq!(config.performance.virtualization_threshold, 100);
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assettree.yml");
        std::fs::write(&path, "search_cache_capacity: 32\nlogging:\n  level: debug\n").unwrap();

        let config = AssetTreeConfig::load_from_file(&path).unwrap();
        assert_eq!(config.search_cache_capacity, 32);
        assert_eq!(config.log_options().level, LogLevel::Debug);
    }

    #[test]
    fn test_unknown_extension_and_bad_content() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("assettree.ini");
        std::fs::write(&ini, "").unwrap();
        assert!(matches!(
            AssetTreeConfig::load_from_file(&ini),
            Err(ConfigError::UnsupportedFormat { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "autosave_delay_ms = \"soon\"").unwrap();
        assert!(matches!(
            AssetTreeConfig::load_from_file(&broken),
            Err(ConfigError::Parse { format: "TOML", .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = AssetTreeConfig::default();
        let overrides = HashMap::from([
            ("STORAGE_BACKEND".to_string(), "MEMORY".to_string()),
            ("STORAGE_DIR".to_string(), "/tmp/assettree-test".to_string()),
            ("AUTOSAVE_DELAY_MS".to_string(), "50".to_string()),
            ("SEARCH_CACHE_CAPACITY".to_string(), "many".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);

        config.apply_overrides(&overrides);

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.resolved_directory(), PathBuf::from("/tmp/assettree-test"));
        assert_eq!(config.autosave_delay_ms, 50);
        assert_eq!(config.search_cache_capacity, 256);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = AssetTreeConfig::default();
        config.search_cache_capacity = 0;
        config.persistence.storage_key = "../escape".to_string();
        config.logging.level = "loud".to_string();

        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }

    #[test]
    fn test_trimmed_history_must_fit() {
        let mut config = AssetTreeConfig::default();
        config.persistence.max_history_size = 10;
        assert!(!config.is_valid());
        config.persistence.trimmed_history_size = 5;
        assert!(config.is_valid());
    }
}
