//! Durable, rank-ordered leaderboard.
//!
//! Rows are kept sorted by bac descending, ties broken by earlier timestamp.
//! Every insert re-reads the backend, then rewrites the whole collection through
//! it. Nothing is cached between calls, so a failed write leaves no visible
//! mutation.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StorageError, ValidationError};
use crate::reading::{leaderboard_order, LeaderboardEntry, Reading};

use super::backend::{JsonFileBackend, LeaderboardBackend, MemoryBackend};

/// Upper bound on rows returned by one page.
pub const MAX_PAGE_LIMIT: usize = 200;
pub const DEFAULT_PAGE_LIMIT: usize = 25;

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Negative offsets are rejected; limit is clamped into `1..=MAX_PAGE_LIMIT`.
    pub fn new(offset: i64, limit: i64) -> Result<Self, ValidationError> {
        let offset = usize::try_from(offset).map_err(|_| {
            ValidationError::invalid("offset", format!("must be >= 0, got {offset}"))
        })?;
        let limit = limit.clamp(1, MAX_PAGE_LIMIT as i64) as usize;
        Ok(Self { offset, limit })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub total: usize,
    pub items: Vec<LeaderboardEntry>,
}

/// Index at which `target` keeps `rows` in leaderboard order.
///
/// Binary search over `[left, right)`: while `rows[mid]` sorts at or before the
/// target, continue strictly right of `mid`; otherwise continue at or before it.
/// Rows with the same bac and an earlier or equal timestamp therefore stay ahead
/// of the new row.
pub fn insertion_point(rows: &[Reading], target: &Reading) -> usize {
    let (mut left, mut right) = (0, rows.len());
    while left < right {
        let mid = left + (right - left) / 2;
        if leaderboard_order(&rows[mid], target) != Ordering::Greater {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    left
}

/// Leaderboard store.
///
/// The backend is the source of truth: every operation re-reads it under one
/// mutex, so rows written by another store on the same file (the admin CLI
/// replaying orphans while the server runs) are never overwritten.
pub struct RankedStore {
    backend: Box<dyn LeaderboardBackend>,
    lock: Mutex<()>,
}

impl RankedStore {
    pub fn new(backend: Box<dyn LeaderboardBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Store backed by a JSON file at `path`.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Box::new(JsonFileBackend::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Current collection in leaderboard order.
    pub fn load(&self) -> Result<Vec<Reading>, StorageError> {
        let _guard = self.locked()?;
        self.read_sorted()
    }

    /// Insert `reading` at its ordered position, persist, and return its 1-based rank.
    pub fn insert(&self, reading: Reading) -> Result<usize, StorageError> {
        let _guard = self.locked()?;
        let mut rows = self.read_sorted()?;

        let index = insertion_point(&rows, &reading);
        rows.insert(index, reading);

        self.backend.write_all(&rows)?;
        debug!(rank = index + 1, total = rows.len(), "leaderboard row inserted");
        Ok(index + 1)
    }

    /// Top `n` rows with live ranks.
    pub fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StorageError> {
        Ok(ranked(&self.load()?, 0, n))
    }

    /// One page of rows with live ranks, plus the total row count.
    pub fn page(&self, request: PageRequest) -> Result<Page, StorageError> {
        let rows = self.load()?;
        Ok(Page {
            total: rows.len(),
            items: ranked(&rows, request.offset, request.limit),
        })
    }

    /// Newest timestamp across all rows.
    pub fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.load()?.iter().map(|r| r.timestamp).max())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    fn locked(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.lock.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Read the backend, initialising it on first use. Caller holds the lock.
    fn read_sorted(&self) -> Result<Vec<Reading>, StorageError> {
        match self.backend.read_all()? {
            Some(mut rows) => {
                rows.sort_by(leaderboard_order);
                Ok(rows)
            }
            None => {
                // Reads still work if this fails.
                if let Err(e) = self.backend.write_all(&[]) {
                    warn!(
                        store = %self.backend.describe(),
                        error = %e,
                        "could not initialise leaderboard"
                    );
                }
                Ok(Vec::new())
            }
        }
    }
}

fn ranked(rows: &[Reading], offset: usize, limit: usize) -> Vec<LeaderboardEntry> {
    rows.iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(i, r)| LeaderboardEntry::from_reading(r.clone(), i + 1))
        .collect()
}
