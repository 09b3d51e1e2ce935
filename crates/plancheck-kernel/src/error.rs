//! Error types for the engine.
//!
//! Only hard input errors and collaborator contract failures are errors.
//! Content defects (overlaps, missed keywords, ...) are never errors; they
//! are aggregated into a failing `ValidationResult`.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// A schedule that cannot be judged at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// An item whose end does not come after its start
    #[error("Invalid interval for task \"{task}\": end_time ({end}) must be after start_time ({start})")]
    InvalidInterval {
        task: String,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
}

/// Failure of the generator or extractor collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Output was missing fields or had the wrong shape
    #[error("Malformed collaborator output: {0}")]
    Malformed(String),

    /// The call itself failed
    #[error("Collaborator call failed: {0}")]
    Transport(String),

    /// The call did not finish in time
    #[error("Collaborator call timed out after {0:?}")]
    Timeout(Duration),
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
