//! Session timer.
//!
//! A tick-driven countdown. It has no thread and no clock of its own: the
//! caller invokes `tick()` once per interval and each call removes exactly
//! one second.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Completed            (tick reaches zero)
//! Running | Paused -> Aborted     (cancel)
//! ```
//!
//! Completed and Aborted are terminal. Commands that do not apply to the
//! current state return `None` and change nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
    Aborted,
}

impl TimerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerState::Completed | TimerState::Aborted)
    }
}

/// Point-in-time copy of the timer, handed to the receipt generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerSnapshot {
    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs.saturating_sub(self.remaining_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimer {
    state: TimerState,
    total_secs: u64,
    /// Always within `0..=total_secs`.
    remaining_secs: u64,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

impl SessionTimer {
    /// Create an idle timer for `total_secs`.
    ///
    /// # Errors
    /// Returns an error for a zero-length session.
    pub fn new(total_secs: u64) -> Result<Self, ValidationError> {
        if total_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_secs".into(),
                message: "session length must be at least one second".into(),
            });
        }
        Ok(Self {
            state: TimerState::Idle,
            total_secs,
            remaining_secs: total_secs,
            started_at: None,
        })
    }

    pub fn from_minutes(minutes: u64) -> Result<Self, ValidationError> {
        Self::new(minutes.saturating_mul(60))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// 0.0 .. 1.0
    pub fn progress(&self) -> f64 {
        self.elapsed_secs() as f64 / self.total_secs as f64
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            started_at: self.started_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state != TimerState::Idle {
            return None;
        }
        let now = Utc::now();
        self.state = TimerState::Running;
        self.started_at = Some(now);
        Some(Event::TimerStarted {
            total_secs: self.total_secs,
            at: now,
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Paused;
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state != TimerState::Paused {
            return None;
        }
        self.state = TimerState::Running;
        Some(Event::TimerResumed {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Add time to a running or paused session.
    pub fn extend(&mut self, secs: u64) -> Option<Event> {
        if !matches!(self.state, TimerState::Running | TimerState::Paused) || secs == 0 {
            return None;
        }
        let added = secs.min(u64::MAX - self.total_secs);
        self.total_secs += added;
        self.remaining_secs += added;
        Some(Event::TimerExtended {
            added_secs: added,
            total_secs: self.total_secs,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// End the session early.
    pub fn cancel(&mut self) -> Option<Event> {
        if !matches!(self.state, TimerState::Running | TimerState::Paused) {
            return None;
        }
        self.state = TimerState::Aborted;
        Some(Event::TimerAborted {
            elapsed_secs: self.elapsed_secs(),
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Call once per interval. Removes one second while running and returns
    /// `Some(Event::TimerCompleted)` when the countdown hits zero.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = TimerState::Completed;
            return Some(Event::TimerCompleted {
                total_secs: self.total_secs,
                at: Utc::now(),
            });
        }
        None
    }
}
