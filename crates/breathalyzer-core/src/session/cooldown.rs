//! Minimum spacing between sessions.
//!
//! Pure: callers pass the latest known reading time and `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::reading::LeaderboardEntry;
use crate::storage::RankedStore;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownStatus {
    pub allowed: bool,
    pub minutes_remaining: i64,
}

impl CooldownStatus {
    pub fn ready() -> Self {
        Self {
            allowed: true,
            minutes_remaining: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    minutes: u32,
}

impl CooldownPolicy {
    pub fn new(minutes: u32) -> Self {
        Self { minutes }
    }

    /// Decide whether a session may start at `now` given the latest reading time.
    ///
    /// Elapsed time is `now - latest`. A `latest` in the future counts as zero
    /// elapsed, so clock skew never opens the gate early.
    pub fn check(&self, latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CooldownStatus {
        let Some(latest) = latest else {
            return CooldownStatus::ready();
        };

        let window_ms = i64::from(self.minutes) * MS_PER_MINUTE;
        let elapsed_ms = (now - latest).num_milliseconds().max(0);
        if elapsed_ms >= window_ms {
            return CooldownStatus::ready();
        }

        let remaining_ms = window_ms - elapsed_ms;
        CooldownStatus {
            allowed: false,
            minutes_remaining: (remaining_ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE,
        }
    }

    /// Check against the most recent summary, falling back to the newest stored row.
    pub fn can_start(
        &self,
        store: &RankedStore,
        most_recent: Option<&LeaderboardEntry>,
        now: DateTime<Utc>,
    ) -> Result<CooldownStatus, StorageError> {
        let stored = match most_recent {
            Some(_) => None,
            None => store.latest_timestamp()?,
        };
        Ok(self.check(latest_timestamp(most_recent, stored), now))
    }
}

/// The summary's timestamp when there is one, else the store's newest row.
pub fn latest_timestamp(
    most_recent: Option<&LeaderboardEntry>,
    stored: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    most_recent.map(|entry| entry.timestamp).or(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn nothing_recorded_is_ready() {
        let policy = CooldownPolicy::new(15);
        assert_eq!(policy.check(None, t0()), CooldownStatus::ready());
    }

    #[test]
    fn one_minute_short_of_window() {
        let policy = CooldownPolicy::new(15);
        let status = policy.check(Some(t0()), t0() + Duration::minutes(14));
        assert_eq!(
            status,
            CooldownStatus {
                allowed: false,
                minutes_remaining: 1
            }
        );
    }

    #[test]
    fn exactly_at_window_is_ready() {
        let policy = CooldownPolicy::new(15);
        assert_eq!(
            policy.check(Some(t0()), t0() + Duration::minutes(15)),
            CooldownStatus::ready()
        );
    }

    #[test]
    fn partial_minutes_round_up() {
        let policy = CooldownPolicy::new(15);
        let status = policy.check(Some(t0()), t0() + Duration::seconds(30));
        assert_eq!(status.minutes_remaining, 15);

        let status = policy.check(Some(t0()), t0() + Duration::seconds(14 * 60 + 59));
        assert_eq!(status.minutes_remaining, 1);
    }

    #[test]
    fn future_latest_does_not_open_gate() {
        let policy = CooldownPolicy::new(15);
        let status = policy.check(Some(t0() + Duration::hours(2)), t0());
        assert!(!status.allowed);
        assert_eq!(status.minutes_remaining, 15);
    }

    #[test]
    fn zero_minute_cooldown_always_ready() {
        let policy = CooldownPolicy::new(0);
        assert!(policy.check(Some(t0()), t0()).allowed);
    }

    #[test]
    fn summary_wins_over_store() {
        let store = RankedStore::in_memory();
        store.insert(Reading::new("old", 0.2, t0())).unwrap();
        let recent = LeaderboardEntry::from_reading(
            Reading::new("new", 0.1, t0() + Duration::minutes(10)),
            2,
        );

        let policy = CooldownPolicy::new(15);
        let now = t0() + Duration::minutes(16);
        assert!(policy.can_start(&store, None, now).unwrap().allowed);
        assert!(!policy.can_start(&store, Some(&recent), now).unwrap().allowed);
    }
}
