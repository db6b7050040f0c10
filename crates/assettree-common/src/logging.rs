//! Logging bootstrap for the asset tree core
//!
//! Libraries in this workspace only emit `tracing` events. The host (or the
//! `assettree` binary) calls [`init`] once at startup to install a formatting
//! subscriber:
//! - Minimum level from [`LogOptions`], overridable with `ASSETTREE_LOG`
//! - Optional ANSI colouring for terminals
//! - Repeated initialization is a no-op rather than a panic
//!
//! [`format_error`] renders an error together with its cause chain so that
//! persistence failures carry the underlying I/O reason into the log line.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter
pub const LOG_ENV_VAR: &str = "ASSETTREE_LOG";

/// Log levels accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Directive string understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Logging configuration options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Minimum log level
    pub level: LogLevel,
    /// Emit ANSI colour codes
    pub ansi: bool,
    /// Extra `EnvFilter` directives, e.g. `assettree_persistence=debug`
    pub directives: Vec<String>,
}

/// Logging bootstrap errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },
}

/// Build the filter from options, letting `ASSETTREE_LOG` take precedence
pub fn build_filter(options: &LogOptions) -> Result<EnvFilter, LoggingError> {
    if let Ok(from_env) = std::env::var(LOG_ENV_VAR) {
        return EnvFilter::try_new(&from_env).map_err(|e| LoggingError::InvalidFilter {
            directive: from_env,
            message: e.to_string(),
        });
    }

    let mut filter = EnvFilter::new(options.level.as_str());
    for directive in &options.directives {
        let parsed = directive
            .parse()
            .map_err(|e: tracing_subscriber::filter::ParseError| LoggingError::InvalidFilter {
                directive: directive.clone(),
                message: e.to_string(),
            })?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed (for example
/// by a test harness or the embedding application).
pub fn init(options: LogOptions) -> Result<bool, LoggingError> {
    let filter = build_filter(&options)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(options.ansi)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = options.level.as_str(), "Logging initialized");
    }
    Ok(installed)
}

/// Format an error with cause chain
pub fn format_error(error: &dyn std::error::Error) -> String {
    format_error_recursive(error, 0)
}

fn format_error_recursive(error: &dyn std::error::Error, depth: usize) -> String {
    const MAX_DEPTH: usize = 10;

    if depth >= MAX_DEPTH {
        return error.to_string();
    }

    let base = error.to_string();

    if let Some(source) = error.source() {
        format!("{} Caused by: {}", base, format_error_recursive(source, depth + 1))
    } else {
        base
    }
}
