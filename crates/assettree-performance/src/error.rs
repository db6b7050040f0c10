//! Performance monitor errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PerformanceError {
    /// The monitor was destroyed and must not be reused
    #[error("Performance monitor has been destroyed")]
    MonitorDestroyed,

    /// Timers need a Tokio runtime
    #[error("No Tokio runtime available to schedule {task}")]
    NoRuntime { task: &'static str },
}
