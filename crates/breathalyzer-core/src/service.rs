//! The breathalyzer station: one gate, one leaderboard, one most-recent summary.
//!
//! Every adapter (HTTP server, CLI) goes through [`Breathalyzer`]; nothing outside
//! this module touches the gate and the store together.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, GateError, IngestError, StorageError};
use crate::ingest::{MostRecentSummary, ReadingIngestor};
use crate::reading::{sanitize_name, BacInput, LeaderboardEntry};
use crate::session::{latest_timestamp, CooldownStatus, Session, SessionGate, SessionHandle};
use crate::storage::{Config, OrphanQueue, Page, PageRequest, RankedStore, ReplayReport};

/// What the station is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StationStatus {
    /// A session is waiting for its reading.
    Busy,
    CoolingDown { minutes_remaining: i64 },
    Ready,
}

pub struct Breathalyzer {
    config: Config,
    store: RankedStore,
    gate: SessionGate,
    summary: MostRecentSummary,
    orphans: OrphanQueue,
}

impl Breathalyzer {
    pub fn from_parts(config: Config, store: RankedStore, orphans: OrphanQueue) -> Self {
        let gate = SessionGate::new(config.session_timeout());
        Self {
            config,
            store,
            gate,
            summary: MostRecentSummary::new(),
            orphans,
        }
    }

    /// Open the station over files in `data_dir` and replay any orphaned readings.
    ///
    /// # Errors
    ///
    /// Returns an error if the leaderboard or orphan file exists but cannot be read.
    pub fn open(config: Config, data_dir: &Path) -> Result<Self, CoreError> {
        let store = RankedStore::open(config.leaderboard_path(data_dir));
        let orphans = OrphanQueue::open(config.orphans_path(data_dir))?;
        let station = Self::from_parts(config, store, orphans);

        let rows = station.store.len()?;
        info!(store = %station.store.describe(), rows, "leaderboard loaded");

        if !station.orphans.is_empty() {
            let report = station.replay_orphans();
            if report.remaining > 0 {
                warn!(remaining = report.remaining, "orphaned readings still pending after replay");
            }
        }
        Ok(station)
    }

    /// Station with nothing on disk.
    pub fn in_memory(config: Config) -> Self {
        Self::from_parts(config, RankedStore::in_memory(), OrphanQueue::in_memory())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &RankedStore {
        &self.store
    }

    /// Whether the cooldown since the last reading has elapsed.
    pub fn cooldown(&self, now: DateTime<Utc>) -> Result<CooldownStatus, StorageError> {
        let latest = self.latest_reading_time(self.gate.last_completed_at())?;
        Ok(self.config.cooldown().check(latest, now))
    }

    pub fn status(&self, now: DateTime<Utc>) -> Result<StationStatus, StorageError> {
        if self.gate.peek(now) {
            return Ok(StationStatus::Busy);
        }
        let cooldown = self.cooldown(now)?;
        Ok(if cooldown.allowed {
            StationStatus::Ready
        } else {
            StationStatus::CoolingDown {
                minutes_remaining: cooldown.minutes_remaining,
            }
        })
    }

    /// Cache `raw_name` as the next person to blow.
    ///
    /// The cooldown is evaluated while the gate is held, so a reading that lands
    /// between the check and the acquire cannot slip a second session through.
    pub fn start_session(
        &self,
        raw_name: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionHandle, CoreError> {
        let name = sanitize_name(raw_name, self.config.reading.name_max_chars)?;
        let policy = self.config.cooldown();

        self.gate.try_acquire_with(&name, now, |last_completed| {
            let latest = self.latest_reading_time(last_completed)?;
            let status = policy.check(latest, now);
            if status.allowed {
                Ok(())
            } else {
                info!(
                    name = %name,
                    minutes_remaining = status.minutes_remaining,
                    "session start refused: cooling down"
                );
                Err(CoreError::from(GateError::CoolingDown {
                    minutes_remaining: status.minutes_remaining,
                }))
            }
        })
    }

    /// True iff a session is waiting for a reading. Polled by the sensor.
    pub fn should_start(&self, now: DateTime<Utc>) -> bool {
        self.gate.peek(now)
    }

    pub fn submit(
        &self,
        raw: &BacInput,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, IngestError> {
        self.ingestor().submit(raw, now)
    }

    /// The last successfully recorded reading, rank as it was at insertion.
    pub fn most_recent(&self) -> Option<LeaderboardEntry> {
        self.summary.get()
    }

    pub fn page(&self, offset: i64, limit: i64) -> Result<Page, CoreError> {
        let request = PageRequest::new(offset, limit)?;
        Ok(self.store.page(request)?)
    }

    pub fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StorageError> {
        self.store.top_n(n)
    }

    pub fn orphans(&self) -> &OrphanQueue {
        &self.orphans
    }

    pub fn replay_orphans(&self) -> ReplayReport {
        self.orphans.replay(&self.store)
    }

    /// Drop a waiting session that has outlived the configured timeout.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Option<Session> {
        self.gate.expire_stale(now)
    }

    fn ingestor(&self) -> ReadingIngestor<'_> {
        ReadingIngestor {
            gate: &self.gate,
            store: &self.store,
            summary: &self.summary,
            orphans: &self.orphans,
            limits: self.config.bac_limits(),
        }
    }

    fn latest_reading_time(
        &self,
        last_completed: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let most_recent = self.summary.get();
        let stored = match most_recent {
            Some(_) => None,
            None => self.store.latest_timestamp()?,
        };
        let latest = latest_timestamp(most_recent.as_ref(), stored);
        Ok(latest.max(last_completed))
    }
}
