//! # Breathalyzer Core Library
//!
//! Core logic for a breathalyzer leaderboard station. A person registers their
//! name, a sensor polls for a pending session, takes a reading and submits it,
//! and the reading is placed into a durable, rank-ordered leaderboard.
//!
//! The HTTP server and the CLI are thin adapters over [`Breathalyzer`].
//!
//! ## Architecture
//!
//! - **Session gate**: a single slot, so at most one person waits for a reading
//! - **Cooldown**: minimum spacing between sessions, measured from the last reading
//! - **Ranked store**: leaderboard kept sorted (bac descending, earlier first on
//!   ties) and rewritten atomically on every insert
//! - **Orphans**: readings whose write failed after the session was consumed
//! - **Config**: TOML file in the data directory
//!
//! ## Key Components
//!
//! - [`Breathalyzer`]: the station service
//! - [`SessionGate`]: single-slot session state machine
//! - [`RankedStore`]: ordered leaderboard persistence
//! - [`Config`]: application configuration

pub mod error;
pub mod ingest;
pub mod reading;
pub mod service;
pub mod session;
pub mod storage;

pub use error::{ConfigError, CoreError, GateError, IngestError, StorageError, ValidationError};
pub use ingest::{MostRecentSummary, ReadingIngestor};
pub use reading::{BacInput, BacLimits, LeaderboardEntry, OutOfRangePolicy, Reading};
pub use service::{Breathalyzer, StationStatus};
pub use session::{
    CooldownPolicy, CooldownStatus, Session, SessionGate, SessionHandle, SessionState,
};
pub use storage::{
    data_dir, Config, OrphanQueue, Page, PageRequest, RankedStore, ReplayReport,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
