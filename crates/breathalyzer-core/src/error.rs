//! Core error types for breathalyzer-core.
//!
//! Every failure the workflow can produce is a typed variant here. The HTTP and
//! CLI layers map these onto status codes and exit codes; nothing is swallowed.

use std::path::PathBuf;
use thiserror::Error;

use crate::reading::Reading;

/// Core error type for breathalyzer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range client data
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Session gate refused the transition
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Reading ingestion failed
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Persisted leaderboard could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation errors for client-supplied values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value could not be parsed or is otherwise unusable
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Well-formed number outside the accepted range
    #[error("Value {value} for '{field}' is outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Leaderboard persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Collection could not be serialized
    #[error("Failed to serialize leaderboard: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Backing file exists but does not hold a leaderboard
    #[error("Corrupt leaderboard at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Store lock was poisoned by a panicking writer
    #[error("Leaderboard lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Session gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Another session is already awaiting a reading
    #[error("Another user is already pending")]
    Busy,

    /// A reading arrived while no session was active
    #[error("No active session")]
    NoActiveSession,

    /// Session start requested without a usable name
    #[error("Session name must not be empty")]
    EmptyName,

    /// Not enough time has passed since the last reading
    #[error("Cooldown active: wait {minutes_remaining} more minute(s)")]
    CoolingDown { minutes_remaining: i64 },
}

/// Reading ingestion errors.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Submitted BAC was not a usable number
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// No session was waiting for this reading
    #[error("No active session")]
    NoSession,

    /// The session was consumed but the durable write failed.
    /// The reading has been handed to the orphan queue.
    #[error("Failed to persist reading for '{}': {source}", reading.name)]
    PersistFailed {
        reading: Reading,
        #[source]
        source: StorageError,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Dot-path key does not name a configuration field
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
