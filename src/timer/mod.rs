//! Study timer whose elapsed time is always derived from a persisted start
//! timestamp, so it survives restarts, sleep and crashes.

mod clock;
mod store;
mod ticker;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::StudyApi;
use crate::models::{NewStudySessionRequest, StudySession};

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{FileTimerStore, MemoryTimerStore, StoreError, TimerStore};
pub use ticker::TimerTicker;

/// Sessions shorter than this are discarded on stop.
pub const MIN_SAVED_SECONDS: i64 = 60;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("Select a subject before starting the timer")]
    NoSubjectSelected,

    #[error("Invalid subject id: {0:?}")]
    InvalidSubject(String),

    #[error("Timer is already running")]
    AlreadyRunning,

    #[error("Timer is not running")]
    NotRunning,

    #[error("Timer is not paused")]
    NotPaused,

    #[error("Timer has not been started")]
    NotStarted,

    #[error("Subject cannot change while a session is in progress")]
    SubjectLocked,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Ready,
    Running,
    Paused,
}

/// Persisted form of the timer, stored as camelCase JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub paused_elapsed_seconds: i64,
    #[serde(default)]
    pub selected_subject_id: String,
}

impl TimerState {
    /// `None` when the flags and fields contradict each other.
    pub fn checked_phase(&self) -> Option<Phase> {
        match (self.is_running, self.is_paused) {
            (false, false) => Some(Phase::Ready),
            (false, true) => None,
            (true, _) if parse_subject(&self.selected_subject_id).is_err() => None,
            (true, false) => self.start_timestamp.map(|_| Phase::Running),
            (true, true) => (self.paused_elapsed_seconds >= 0).then_some(Phase::Paused),
        }
    }

    pub fn phase(&self) -> Phase {
        self.checked_phase().unwrap_or(Phase::Ready)
    }

    pub fn elapsed_seconds(&self, now_millis: i64) -> i64 {
        match self.phase() {
            Phase::Ready => 0,
            Phase::Paused => self.paused_elapsed_seconds,
            Phase::Running => match self.start_timestamp {
                Some(start) => seconds_since(start, now_millis),
                None => 0,
            },
        }
    }

    pub fn snapshot(&self, now_millis: i64) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase(),
            elapsed_seconds: self.elapsed_seconds(now_millis),
            subject_id: parse_subject(&self.selected_subject_id).ok(),
        }
    }
}

/// What a display needs to render the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub elapsed_seconds: i64,
    pub subject_id: Option<i64>,
}

impl Default for TimerSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Ready,
            elapsed_seconds: 0,
            subject_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// Too short to keep.
    Discarded { elapsed_seconds: i64 },
    Saved(StudySession),
    /// The session was lost; the reason is meant for the user.
    SaveFailed(String),
}

/// Floor of whole seconds between two epoch-millisecond instants, never negative.
fn seconds_since(start_millis: i64, now_millis: i64) -> i64 {
    now_millis.saturating_sub(start_millis).max(0) / 1000
}

fn parse_subject(raw: &str) -> Result<i64, TimerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TimerError::NoSubjectSelected);
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TimerError::InvalidSubject(raw.to_string())),
    }
}

pub struct Timer {
    state: TimerState,
    clock: Arc<dyn Clock>,
    store: Arc<dyn TimerStore>,
}

impl Timer {
    /// Loads the persisted timer. A running timer keeps its stored start, so
    /// elapsed time picks up whatever passed while nothing was watching.
    pub fn restore(clock: Arc<dyn Clock>, store: Arc<dyn TimerStore>) -> Result<Self, TimerError> {
        let state = match store.load() {
            Ok(Some(state)) if state.checked_phase().is_some() => state,
            Ok(Some(state)) => {
                warn!("discarding inconsistent timer state: {:?}", state);
                store.clear()?;
                TimerState::default()
            }
            Ok(None) => TimerState::default(),
            Err(StoreError::Corrupt(e)) => {
                warn!("discarding corrupt timer state: {}", e);
                store.clear()?;
                TimerState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            state,
            clock,
            store,
        })
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn selected_subject(&self) -> &str {
        &self.state.selected_subject_id
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.state.elapsed_seconds(self.clock.now_millis())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.state.snapshot(self.clock.now_millis())
    }

    /// Writes `next` and only then adopts it.
    fn commit(&mut self, next: TimerState) -> Result<(), TimerError> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), TimerError> {
        self.store.clear()?;
        self.state = TimerState::default();
        Ok(())
    }

    /// Picks the subject for the next session. During a session only the
    /// subject already locked in is accepted, and selecting it is a no-op.
    pub fn select_subject(&mut self, subject_id: &str) -> Result<(), TimerError> {
        let subject_id = subject_id.trim();
        if self.phase() != Phase::Ready {
            if subject_id == self.state.selected_subject_id {
                return Ok(());
            }
            return Err(TimerError::SubjectLocked);
        }
        self.commit(TimerState {
            selected_subject_id: subject_id.to_string(),
            ..TimerState::default()
        })
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        match self.phase() {
            Phase::Running => return Err(TimerError::AlreadyRunning),
            Phase::Paused => return self.resume(),
            Phase::Ready => {}
        }
        let subject_id = parse_subject(&self.state.selected_subject_id)?;

        let now = self.clock.now_millis();
        self.commit(TimerState {
            is_running: true,
            is_paused: false,
            start_timestamp: Some(now),
            paused_elapsed_seconds: 0,
            selected_subject_id: self.state.selected_subject_id.clone(),
        })?;
        info!("timer started for subject {} at {}", subject_id, now);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.phase() != Phase::Running {
            return Err(TimerError::NotRunning);
        }
        let elapsed = self.elapsed_seconds();

        self.commit(TimerState {
            is_paused: true,
            paused_elapsed_seconds: elapsed,
            ..self.state.clone()
        })?;
        info!("timer paused at {}s", elapsed);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        if self.phase() != Phase::Paused {
            return Err(TimerError::NotPaused);
        }
        let paused = self.state.paused_elapsed_seconds;
        let start = self.clock.now_millis().saturating_sub(paused.saturating_mul(1000));

        self.commit(TimerState {
            is_paused: false,
            start_timestamp: Some(start),
            paused_elapsed_seconds: 0,
            ..self.state.clone()
        })?;
        info!("timer resumed from {}s", paused);
        Ok(())
    }

    /// Ends the session and submits it when it lasted at least a minute.
    ///
    /// The stored state is cleared before the submission, so a session is
    /// never sent twice. A failed submission is reported in the outcome.
    pub async fn stop(&mut self, api: &dyn StudyApi) -> Result<StopOutcome, TimerError> {
        if self.phase() == Phase::Ready {
            return Err(TimerError::NotStarted);
        }
        let elapsed_seconds = self.elapsed_seconds();
        let subject_id = parse_subject(&self.state.selected_subject_id).ok();

        self.clear()?;

        let subject_id = match subject_id {
            Some(id) if elapsed_seconds >= MIN_SAVED_SECONDS => id,
            _ => {
                info!("timer stopped after {}s, not saved", elapsed_seconds);
                return Ok(StopOutcome::Discarded { elapsed_seconds });
            }
        };

        let req = NewStudySessionRequest {
            subject_id,
            duration_minutes: elapsed_seconds / 60,
            notes: None,
        };
        match api.create_study_session(&req).await {
            Ok(session) => {
                info!(
                    "saved {} minute session for subject {}",
                    session.duration_minutes, subject_id
                );
                Ok(StopOutcome::Saved(session))
            }
            Err(e) => {
                warn!("failed to save study session: {}", e);
                Ok(StopOutcome::SaveFailed(e.to_string()))
            }
        }
    }

    /// Drops the session without submitting anything.
    pub fn reset(&mut self) -> Result<(), TimerError> {
        self.clear()?;
        info!("timer reset");
        Ok(())
    }
}
