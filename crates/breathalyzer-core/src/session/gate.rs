//! Single-slot session gate.
//!
//! At most one session waits for a reading at any time. Every transition runs
//! under one mutex, so two callers can never both observe an empty slot and both
//! fill it.
//!
//! ## State Transitions
//!
//! ```text
//! Empty -> AwaitingReading -> (Completed, handed to caller) -> Empty
//!                   \-> expired (timeout) -> Empty
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingReading,
    Completed,
}

/// The in-flight pairing of a cached name with a future reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    pub bac: Option<f64>,
}

impl Session {
    fn new(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            started_at: now,
            state: SessionState::AwaitingReading,
            bac: None,
        }
    }

    /// Attach the reading. Also updates state to completed.
    fn complete(mut self, bac: f64) -> Self {
        self.bac = Some(bac);
        self.state = SessionState::Completed;
        self
    }

    fn is_expired(&self, now: DateTime<Utc>, timeout: Option<Duration>) -> bool {
        timeout.is_some_and(|t| now - self.started_at >= t)
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            name: self.name.clone(),
            started_at: self.started_at,
        }
    }
}

/// What a caller gets back after acquiring the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    AwaitingReading(Session),
}

#[derive(Debug, Default)]
struct GateInner {
    slot: Slot,
    /// Start time of the last session handed out by `consume`.
    last_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SessionGate {
    inner: Mutex<GateInner>,
    timeout: Option<Duration>,
}

impl SessionGate {
    /// Gate whose sessions expire after `timeout`; `None` keeps them forever.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(GateInner::default()),
            timeout,
        }
    }

    /// Occupy the slot with `name`. Fails with `Busy` while a session is waiting.
    pub fn try_acquire(&self, name: &str, now: DateTime<Utc>) -> Result<SessionHandle, GateError> {
        self.try_acquire_with(name, now, |_| Ok::<(), GateError>(()))
    }

    /// Like [`try_acquire`](Self::try_acquire), but `admit` runs under the gate lock
    /// once the slot is known to be free. It receives the start time of the last
    /// consumed session and can veto the acquisition.
    pub fn try_acquire_with<E, F>(
        &self,
        name: &str,
        now: DateTime<Utc>,
        admit: F,
    ) -> Result<SessionHandle, E>
    where
        E: From<GateError>,
        F: FnOnce(Option<DateTime<Utc>>) -> Result<(), E>,
    {
        if name.trim().is_empty() {
            return Err(GateError::EmptyName.into());
        }

        let mut inner = self.lock();
        self.clear_expired(&mut inner, now);

        if let Slot::AwaitingReading(current) = &inner.slot {
            info!(pending = %current.name, requested = %name, "session start refused: busy");
            return Err(GateError::Busy.into());
        }

        admit(inner.last_completed_at)?;

        let session = Session::new(name, now);
        let handle = session.handle();
        info!(id = %session.id, name = %session.name, "session started");
        inner.slot = Slot::AwaitingReading(session);
        Ok(handle)
    }

    /// True iff a live session is waiting for a reading.
    pub fn peek(&self, now: DateTime<Utc>) -> bool {
        let inner = self.lock();
        match &inner.slot {
            Slot::AwaitingReading(session) => !session.is_expired(now, self.timeout),
            Slot::Empty => false,
        }
    }

    /// Attach `bac` to the waiting session and free the slot.
    ///
    /// This is the only way out of `AwaitingReading` besides expiry. Never blocks on
    /// an empty gate.
    pub fn consume(&self, bac: f64, now: DateTime<Utc>) -> Result<Session, GateError> {
        let mut inner = self.lock();
        self.clear_expired(&mut inner, now);

        match std::mem::take(&mut inner.slot) {
            Slot::Empty => Err(GateError::NoActiveSession),
            Slot::AwaitingReading(session) => {
                let completed = session.complete(bac);
                inner.last_completed_at = Some(completed.started_at);
                info!(id = %completed.id, name = %completed.name, bac, "session completed");
                Ok(completed)
            }
        }
    }

    /// Drop the waiting session if it has outlived the timeout.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Option<Session> {
        let mut inner = self.lock();
        self.clear_expired(&mut inner, now)
    }

    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_completed_at
    }

    fn clear_expired(&self, inner: &mut GateInner, now: DateTime<Utc>) -> Option<Session> {
        let expired = matches!(
            &inner.slot,
            Slot::AwaitingReading(s) if s.is_expired(now, self.timeout)
        );
        if !expired {
            return None;
        }

        match std::mem::take(&mut inner.slot) {
            Slot::AwaitingReading(session) => {
                warn!(
                    id = %session.id,
                    name = %session.name,
                    started_at = %session.started_at,
                    "session expired without a reading"
                );
                Some(session)
            }
            Slot::Empty => None,
        }
    }

    // The slot is a plain enum written in one assignment; a panic elsewhere
    // cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
