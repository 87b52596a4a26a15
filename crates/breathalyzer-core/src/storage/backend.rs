//! Persistence backends for the ranked store.
//!
//! The store owns ordering and locking; a backend only moves a whole ordered
//! collection to and from durable storage.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StorageError;
use crate::reading::Reading;

use super::write_json_atomic;

/// Durable home of the leaderboard rows.
pub trait LeaderboardBackend: Send + Sync {
    /// Read every persisted row. `Ok(None)` means nothing has been persisted yet.
    fn read_all(&self) -> Result<Option<Vec<Reading>>, StorageError>;

    /// Replace the persisted rows with `readings` in one atomic step.
    fn write_all(&self, readings: &[Reading]) -> Result<(), StorageError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// JSON document on the local filesystem, replaced via temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LeaderboardBackend for JsonFileBackend {
    fn read_all(&self) -> Result<Option<Vec<Reading>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn write_all(&self, readings: &[Reading]) -> Result<(), StorageError> {
        write_json_atomic(&self.path, readings)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process backend for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Mutex<Option<Vec<Reading>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-persisted collection.
    pub fn with_rows(rows: Vec<Reading>) -> Self {
        Self {
            rows: Mutex::new(Some(rows)),
        }
    }
}

impl LeaderboardBackend for MemoryBackend {
    fn read_all(&self) -> Result<Option<Vec<Reading>>, StorageError> {
        let rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(rows.clone())
    }

    fn write_all(&self, readings: &[Reading]) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        *rows = Some(readings.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
