//! Shared building blocks for the asset tree crates
//!
//! - [`scheduling`]: debounce and throttle wrappers driven by the Tokio clock
//! - [`logging`]: one-shot `tracing` subscriber bootstrap and error formatting
//! - [`validation`]: range validators used for clamped UI knobs and config checks

pub mod logging;
pub mod scheduling;
pub mod validation;

pub use logging::{format_error, LogLevel, LogOptions};
pub use scheduling::{Debouncer, Throttler};
pub use validation::{RangeValidator, Validatable, ValidationError};
