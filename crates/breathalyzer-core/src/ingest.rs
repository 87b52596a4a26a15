//! Turning a raw BAC value into a ranked leaderboard row.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{GateError, IngestError};
use crate::reading::{BacInput, BacLimits, LeaderboardEntry, Reading};
use crate::session::SessionGate;
use crate::storage::{OrphanQueue, RankedStore};

/// The last successfully recorded reading, with its rank at insertion time.
///
/// The rank is frozen: later inserts do not update it.
#[derive(Debug, Default)]
pub struct MostRecentSummary {
    entry: Mutex<Option<LeaderboardEntry>>,
}

impl MostRecentSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: LeaderboardEntry) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    pub fn get(&self) -> Option<LeaderboardEntry> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Borrowed view over the pieces one submission touches.
pub struct ReadingIngestor<'a> {
    pub gate: &'a SessionGate,
    pub store: &'a RankedStore,
    pub summary: &'a MostRecentSummary,
    pub orphans: &'a OrphanQueue,
    pub limits: BacLimits,
}

impl ReadingIngestor<'_> {
    /// Validate `raw`, complete the waiting session and rank the reading.
    ///
    /// Invalid input leaves the session untouched. Once the session has been
    /// consumed the reading is never dropped: a failed write (after one retry)
    /// moves it to the orphan queue and surfaces as `PersistFailed`.
    pub fn submit(
        &self,
        raw: &BacInput,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, IngestError> {
        let bac = self.limits.normalize(raw)?;

        let session = self.gate.consume(bac, now).map_err(|e| {
            debug_assert_eq!(e, GateError::NoActiveSession);
            warn!(bac, "reading submitted with no active session");
            IngestError::NoSession
        })?;

        // Readings are stamped with the session start, not the submit time.
        let reading = Reading::new(session.name, bac, session.started_at);

        let rank = match self.store.insert(reading.clone()) {
            Ok(rank) => rank,
            Err(first) => {
                warn!(
                    name = %reading.name,
                    error = %first,
                    "leaderboard write failed, retrying once"
                );
                match self.store.insert(reading.clone()) {
                    Ok(rank) => rank,
                    Err(source) => {
                        self.orphans.push(reading.clone());
                        return Err(IngestError::PersistFailed { reading, source });
                    }
                }
            }
        };

        let entry = LeaderboardEntry::from_reading(reading, rank);
        info!(name = %entry.name, bac = entry.bac, rank = entry.rank, "reading recorded");
        self.summary.record(entry.clone());
        Ok(entry)
    }
}
