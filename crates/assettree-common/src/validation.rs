//! Validation traits and range validators
//!
//! UI knobs are clamped into their documented ranges rather than rejected,
//! while configuration values are rejected when out of range. Both go through
//! [`RangeValidator`] so the bounds live in one place.

use std::fmt::Display;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Validation error with context
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Value out of range for {field}: expected {expected}, got {actual}")]
    OutOfRange {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Trait for types that can be validated
pub trait Validatable {
    /// Validate the instance, returning Ok(()) if valid or a ValidationError if invalid
    fn validate(&self) -> Result<(), ValidationError>;

    /// Check if the instance is valid without returning the error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Inclusive numeric range bound to a field name
#[derive(Debug, Clone)]
pub struct RangeValidator<T> {
    field: &'static str,
    range: RangeInclusive<T>,
}

impl<T> RangeValidator<T>
where
    T: PartialOrd + Copy + Display,
{
    pub const fn new(field: &'static str, min: T, max: T) -> Self {
        Self {
            field,
            range: RangeInclusive::new(min, max),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn min(&self) -> T {
        *self.range.start()
    }

    pub fn max(&self) -> T {
        *self.range.end()
    }

    pub fn contains(&self, value: T) -> bool {
        self.range.contains(&value)
    }

    /// Pull a value into range
    pub fn clamp(&self, value: T) -> T {
        if value < self.min() {
            self.min()
        } else if value > self.max() {
            self.max()
        } else {
            value
        }
    }

    /// Reject a value outside the range
    pub fn check(&self, value: T) -> Result<T, ValidationError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange {
                field: self.field.to_string(),
                expected: format!("{}..={}", self.min(), self.max()),
                actual: value.to_string(),
            })
        }
    }
}

/// Collect several validation results into one
pub fn collect_errors(results: Vec<Result<(), ValidationError>>) -> Result<(), ValidationError> {
    let mut errors: Vec<ValidationError> = results.into_iter().filter_map(Result::err).collect();
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
