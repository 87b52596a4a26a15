//! Integration tests for the station workflow.
//!
//! Drives the public `Breathalyzer` API the way the HTTP adapter does: register a
//! name, poll, submit, then read the leaderboard back, including across restarts
//! and through a failing backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use breathalyzer_core::storage::{LeaderboardBackend, MemoryBackend};
use breathalyzer_core::{
    BacInput, Breathalyzer, Config, CoreError, GateError, IngestError, OrphanQueue, RankedStore,
    Reading, StationStatus, StorageError,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// Start a session for `name` at `at` and submit `bac` a few seconds later.
fn blow(station: &Breathalyzer, name: &str, bac: f64, at: DateTime<Utc>) -> usize {
    station.start_session(name, at).unwrap();
    assert!(station.should_start(at));
    station
        .submit(&BacInput::Number(bac), at + Duration::seconds(5))
        .unwrap()
        .rank
}

#[test]
fn test_ties_rank_after_earlier_readings() {
    let station = Breathalyzer::in_memory(Config::default());

    assert_eq!(blow(&station, "A", 0.10, t0()), 1);
    assert_eq!(blow(&station, "B", 0.15, t0() + Duration::minutes(20)), 1);
    assert_eq!(blow(&station, "C", 0.10, t0() + Duration::minutes(40)), 3);

    let names: Vec<_> = station.top_n(10).unwrap().into_iter().map(|e| (e.rank, e.name)).collect();
    assert_eq!(
        names,
        vec![(1, "B".to_string()), (2, "A".to_string()), (3, "C".to_string())]
    );
}

#[test]
fn test_jack_then_sam() {
    let station = Breathalyzer::in_memory(Config::default());

    station.start_session("Jack", t0()).unwrap();
    let err = station.start_session("Sam", t0()).unwrap_err();
    assert!(matches!(err, CoreError::Gate(GateError::Busy)));

    station.submit(&BacInput::Number(0.08), t0()).unwrap();

    // Sam is now only held back by the cooldown.
    let later = t0() + Duration::minutes(15);
    let handle = station.start_session("Sam", later).unwrap();
    assert_eq!(handle.name, "Sam");
}

#[test]
fn test_submit_without_session() {
    let station = Breathalyzer::in_memory(Config::default());
    let err = station.submit(&BacInput::Number(0.08), t0()).unwrap_err();
    assert!(matches!(err, IngestError::NoSession));
    assert!(station.most_recent().is_none());
}

#[test]
fn test_clamped_reading_is_persisted_at_bound() {
    let dir = TempDir::new().unwrap();
    let station = Breathalyzer::open(Config::default(), dir.path()).unwrap();
    station.start_session("Jack", t0()).unwrap();

    let entry = station.submit(&BacInput::Text("0.6".into()), t0()).unwrap();
    assert_eq!(entry.bac, 0.5);

    let reloaded = RankedStore::open(Config::default().leaderboard_path(dir.path()));
    assert_eq!(reloaded.load().unwrap(), vec![Reading::new("Jack", 0.5, t0())]);
}

#[test]
fn test_reject_policy() {
    let mut config = Config::default();
    config.set("reading.out_of_range", "reject").unwrap();
    let station = Breathalyzer::in_memory(config);
    station.start_session("Jack", t0()).unwrap();

    let err = station.submit(&BacInput::Number(0.6), t0()).unwrap_err();
    assert!(matches!(err, IngestError::InvalidInput(_)));
    // The session is still waiting for a valid reading.
    assert!(station.should_start(t0()));
}

#[test]
fn test_cooldown_after_reading() {
    let station = Breathalyzer::in_memory(Config::default());
    blow(&station, "Jack", 0.05, t0());

    let status = station.cooldown(t0() + Duration::minutes(14)).unwrap();
    assert!(!status.allowed);
    assert_eq!(status.minutes_remaining, 1);

    let status = station.cooldown(t0() + Duration::minutes(15)).unwrap();
    assert!(status.allowed);
    assert_eq!(status.minutes_remaining, 0);
}

#[test]
fn test_most_recent_keeps_insertion_rank() {
    let station = Breathalyzer::in_memory(Config::default());
    blow(&station, "A", 0.05, t0());
    blow(&station, "B", 0.20, t0() + Duration::minutes(20));
    assert_eq!(station.most_recent().unwrap().name, "B");

    blow(&station, "C", 0.01, t0() + Duration::minutes(40));
    let recent = station.most_recent().unwrap();
    assert_eq!(recent.name, "C");
    assert_eq!(recent.rank, 3);
}

#[test]
fn test_leaderboard_survives_restart() {
    let dir = TempDir::new().unwrap();
    let expected = {
        let station = Breathalyzer::open(Config::default(), dir.path()).unwrap();
        let rows = [("A", 0.10), ("B", 0.30), ("C", 0.10), ("D", 0.02)];
        for (i, (name, bac)) in rows.iter().enumerate() {
            blow(&station, name, *bac, t0() + Duration::minutes(20 * i as i64));
        }
        station.store().load().unwrap()
    };

    let reopened = Breathalyzer::open(Config::default(), dir.path()).unwrap();
    assert_eq!(reopened.store().load().unwrap(), expected);

    let page = reopened.page(1, 2).unwrap();
    assert_eq!(page.total, 4);
    let ranks: Vec<_> = page.items.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![2, 3]);
}

#[test]
fn test_status_progression() {
    let station = Breathalyzer::in_memory(Config::default());
    assert_eq!(station.status(t0()).unwrap(), StationStatus::Ready);

    station.start_session("Jack", t0()).unwrap();
    assert_eq!(station.status(t0()).unwrap(), StationStatus::Busy);

    station.submit(&BacInput::Number(0.1), t0()).unwrap();
    assert_eq!(
        station.status(t0() + Duration::minutes(5)).unwrap(),
        StationStatus::CoolingDown { minutes_remaining: 10 }
    );
}

/// Backend whose writes fail while `broken` is set.
struct SwitchableBackend {
    inner: MemoryBackend,
    broken: Arc<AtomicBool>,
}

impl LeaderboardBackend for SwitchableBackend {
    fn read_all(&self) -> Result<Option<Vec<Reading>>, StorageError> {
        self.inner.read_all()
    }

    fn write_all(&self, readings: &[Reading]) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "switchable".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "read-only filesystem"),
            });
        }
        self.inner.write_all(readings)
    }

    fn describe(&self) -> String {
        "switchable".to_string()
    }
}

#[test]
fn test_failed_write_is_orphaned_and_replayed() {
    let broken = Arc::new(AtomicBool::new(true));
    let backend = SwitchableBackend {
        inner: MemoryBackend::with_rows(Vec::new()),
        broken: Arc::clone(&broken),
    };
    let station = Breathalyzer::from_parts(
        Config::default(),
        RankedStore::new(Box::new(backend)),
        OrphanQueue::in_memory(),
    );

    station.start_session("Jack", t0()).unwrap();
    let err = station.submit(&BacInput::Number(0.08), t0()).unwrap_err();
    assert!(matches!(err, IngestError::PersistFailed { .. }));
    assert!(!station.should_start(t0()));
    assert!(station.top_n(10).unwrap().is_empty());
    assert_eq!(station.orphans().len(), 1);

    broken.store(false, Ordering::SeqCst);
    let report = station.replay_orphans();
    assert_eq!(report.remaining, 0);
    assert_eq!(report.replayed[0].name, "Jack");
    assert_eq!(station.top_n(10).unwrap()[0].bac, 0.08);
}

#[test]
fn test_concurrent_registrations_admit_one() {
    let station = Arc::new(Breathalyzer::in_memory(Config::default()));
    let barrier = Arc::new(std::sync::Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let station = Arc::clone(&station);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                station.start_session(&format!("user{i}"), t0()).is_ok()
            })
        })
        .collect();

    let admitted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
    assert_eq!(admitted, 1);
}
