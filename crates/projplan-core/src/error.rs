//! Core error types for projplan-core.
//!
//! Every failure is raised synchronously where it is detected: configuration
//! problems when a series, registry or scenario is built, allocation and
//! reference problems when a scenario is scheduled. Nothing is retried.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for projplan-core.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A series was queried for a date before its first interval.
    #[error("date {date} is before the first interval of the series (starts {first_start})")]
    OutOfRange {
        date: NaiveDate,
        first_start: NaiveDate,
    },

    /// Malformed series, registry, timeline or scheduling parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The summed focus-area allocations exceed the total capacity of a bucket.
    #[error(
        "Over-allocation in bucket starting {bucket_start}: {allocated:.3} FTE allocated, {capacity:.3} FTE available"
    )]
    OverAllocation {
        bucket_start: NaiveDate,
        allocated: f64,
        capacity: f64,
    },

    /// A name that is not part of the focus-area registry.
    #[error("Unknown focus area '{name}' referenced by {context}")]
    UnknownFocusArea { name: String, context: String },

    /// Backlog file errors
    #[error("Backlog error: {0}")]
    Backlog(#[from] BacklogError),

    /// Scenario file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PlanError {
    /// Shorthand for [`PlanError::InvalidConfiguration`].
    pub fn invalid(message: impl Into<String>) -> Self {
        PlanError::InvalidConfiguration(message.into())
    }

    /// Shorthand for [`PlanError::UnknownFocusArea`].
    pub fn unknown_focus_area(name: impl Into<String>, context: impl Into<String>) -> Self {
        PlanError::UnknownFocusArea {
            name: name.into(),
            context: context.into(),
        }
    }
}

/// Backlog-specific errors.
#[derive(Error, Debug)]
pub enum BacklogError {
    /// The backlog file could not be opened
    #[error("Failed to read backlog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A mandatory column is absent from the header row
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A row could not be interpreted
    #[error("Invalid row at line {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// Scenario configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for PlanError
pub type Result<T, E = PlanError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_allocation_message() {
        let err = PlanError::OverAllocation {
            bucket_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            allocated: 3.5,
            capacity: 3.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-01-01"));
        assert!(msg.contains("3.500"));
    }

    #[test]
    fn test_backlog_error_converts() {
        let err: PlanError = BacklogError::MissingColumn("Number".into()).into();
        assert!(matches!(err, PlanError::Backlog(BacklogError::MissingColumn(_))));
        assert_eq!(err.to_string(), "Backlog error: Missing required column: Number");
    }
}
