//! Readings that were taken but could not be written to the leaderboard.
//!
//! The session slot is already consumed by the time a write fails, so the reading
//! would otherwise be lost. The JSON file is the queue: `push`, `list` and
//! `replay` re-read it, so a server and the admin CLI can share it without
//! replaying a row twice. Rows that could not reach the file are held in memory
//! until a later write succeeds.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::StorageError;
use crate::reading::{LeaderboardEntry, Reading};

use super::backend::{JsonFileBackend, LeaderboardBackend};
use super::ranked_store::RankedStore;
use super::write_json_atomic;

/// Outcome of replaying orphans into the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub replayed: Vec<LeaderboardEntry>,
    pub remaining: usize,
}

pub struct OrphanQueue {
    path: Option<PathBuf>,
    /// Orphans not yet on disk. Everything, for an in-memory queue.
    unsaved: Mutex<Vec<Reading>>,
}

impl OrphanQueue {
    /// Open the queue stored at `path`. Fails if an existing file is unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let pending = JsonFileBackend::new(&path).read_all()?.unwrap_or_default();
        if !pending.is_empty() {
            warn!(count = pending.len(), path = %path.display(), "found orphaned readings");
        }

        Ok(Self {
            path: Some(path),
            unsaved: Mutex::new(Vec::new()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            unsaved: Mutex::new(Vec::new()),
        }
    }

    /// Keep `reading` for a later replay.
    pub fn push(&self, reading: Reading) {
        let mut unsaved = self.lock();
        if self.path.is_none() {
            warn!(name = %reading.name, bac = reading.bac, "reading queued as orphan");
            unsaved.push(reading);
            return;
        }

        let written = self.on_disk().and_then(|mut rows| {
            rows.extend(unsaved.iter().cloned());
            rows.push(reading.clone());
            self.persist(&rows)
        });

        match written {
            Ok(()) => {
                unsaved.clear();
                warn!(name = %reading.name, bac = reading.bac, "reading queued as orphan");
            }
            Err(e) => {
                // Last resort: the log line is the only durable trace left.
                error!(
                    name = %reading.name,
                    bac = reading.bac,
                    timestamp = %reading.timestamp,
                    error = %e,
                    "orphaned reading could not be written to disk"
                );
                unsaved.push(reading);
            }
        }
    }

    pub fn list(&self) -> Vec<Reading> {
        let unsaved = self.lock();
        let mut rows = self.on_disk().unwrap_or_else(|e| {
            warn!(error = %e, "could not read orphan file");
            Vec::new()
        });
        rows.extend(unsaved.iter().cloned());
        rows
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert every orphan into `store`. Readings that still fail stay queued.
    pub fn replay(&self, store: &RankedStore) -> ReplayReport {
        let mut unsaved = self.lock();
        // An unreadable file is left alone; only in-memory rows are replayed.
        let disk = match self.on_disk() {
            Ok(rows) => Some(rows),
            Err(e) => {
                error!(error = %e, "could not read orphan file for replay");
                None
            }
        };

        let mut pending = disk.clone().unwrap_or_default();
        pending.append(&mut unsaved);
        if pending.is_empty() {
            return ReplayReport::default();
        }

        let mut report = ReplayReport::default();
        let mut still_pending = Vec::new();
        for reading in pending {
            match store.insert(reading.clone()) {
                Ok(rank) => report.replayed.push(LeaderboardEntry::from_reading(reading, rank)),
                Err(e) => {
                    warn!(name = %reading.name, error = %e, "orphan replay failed");
                    still_pending.push(reading);
                }
            }
        }
        report.remaining = still_pending.len();

        match disk {
            Some(disk) => {
                if let Err(e) = self.persist(&still_pending) {
                    error!(error = %e, "could not rewrite orphan file after replay");
                    // Rows still in the old file will be offered again.
                    unsaved.extend(still_pending.into_iter().filter(|r| !disk.contains(r)));
                }
            }
            None => *unsaved = still_pending,
        }

        info!(
            replayed = report.replayed.len(),
            remaining = report.remaining,
            "orphan replay finished"
        );
        report
    }

    /// Rows currently in the file. Empty for an in-memory queue.
    fn on_disk(&self) -> Result<Vec<Reading>, StorageError> {
        match &self.path {
            Some(path) => Ok(JsonFileBackend::new(path).read_all()?.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    fn persist(&self, pending: &[Reading]) -> Result<(), StorageError> {
        match &self.path {
            Some(path) => write_json_atomic(path, pending),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reading>> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
