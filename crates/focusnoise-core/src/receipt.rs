//! End-of-session receipt.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReceiptError;
use crate::gamification::RankTransition;
use crate::timer::{TimerSnapshot, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Aborted,
}

/// Summary of one finished session. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    outcome: SessionOutcome,
    session_duration_secs: u64,
    planned_secs: u64,
    started_at: Option<DateTime<Utc>>,
    layers_used: BTreeSet<String>,
    rank_before: String,
    rank_after: String,
    streak_after: u32,
    stats_saved: bool,
}

impl Receipt {
    /// Build a receipt from a finished timer.
    ///
    /// # Errors
    /// [`ReceiptError::InvalidSession`] when the timer has not finished, when
    /// a completed session has no duration, or when the snapshot is
    /// inconsistent.
    pub fn generate(
        timer: &TimerSnapshot,
        layers_used: BTreeSet<String>,
        ranks: &RankTransition,
        streak_after: u32,
        stats_saved: bool,
    ) -> Result<Self, ReceiptError> {
        if timer.remaining_secs > timer.total_secs {
            return Err(ReceiptError::InvalidSession(format!(
                "remaining {}s exceeds total {}s",
                timer.remaining_secs, timer.total_secs
            )));
        }

        let outcome = match timer.state {
            TimerState::Completed => SessionOutcome::Completed,
            TimerState::Aborted => SessionOutcome::Aborted,
            other => {
                return Err(ReceiptError::InvalidSession(format!(
                    "session is still {other:?}"
                )))
            }
        };

        let duration = timer.elapsed_secs();
        if outcome == SessionOutcome::Completed && duration == 0 {
            return Err(ReceiptError::InvalidSession(
                "completed session has no duration".into(),
            ));
        }

        Ok(Self {
            outcome,
            session_duration_secs: duration,
            planned_secs: timer.total_secs,
            started_at: timer.started_at,
            layers_used,
            rank_before: ranks.before.clone(),
            rank_after: ranks.after.clone(),
            streak_after,
            stats_saved,
        })
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    pub fn session_duration_secs(&self) -> u64 {
        self.session_duration_secs
    }

    pub fn planned_secs(&self) -> u64 {
        self.planned_secs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn layers_used(&self) -> &BTreeSet<String> {
        &self.layers_used
    }

    pub fn rank_before(&self) -> &str {
        &self.rank_before
    }

    pub fn rank_after(&self) -> &str {
        &self.rank_after
    }

    pub fn streak_after(&self) -> u32 {
        self.streak_after
    }

    pub fn stats_saved(&self) -> bool {
        self.stats_saved
    }

    pub fn ranked_up(&self) -> bool {
        self.rank_before != self.rank_after
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mins = self.session_duration_secs / 60;
        let secs = self.session_duration_secs % 60;
        let status = match self.outcome {
            SessionOutcome::Completed => "COMPLETE",
            SessionOutcome::Aborted => "ABORTED",
        };

        writeln!(f, "===== SESSION RECEIPT =====")?;
        writeln!(f, "status    {status}")?;
        writeln!(
            f,
            "focus     {mins}m {secs:02}s of {}m",
            self.planned_secs / 60
        )?;
        if !self.layers_used.is_empty() {
            let layers: Vec<&str> = self.layers_used.iter().map(String::as_str).collect();
            writeln!(f, "sounds    {}", layers.join(" + "))?;
        }
        if self.ranked_up() {
            writeln!(f, "rank      {} -> {}", self.rank_before, self.rank_after)?;
        } else {
            writeln!(f, "rank      {}", self.rank_after)?;
        }
        writeln!(
            f,
            "streak    {} day{}",
            self.streak_after,
            if self.streak_after == 1 { "" } else { "s" }
        )?;
        if !self.stats_saved {
            writeln!(f, "note      stats were not saved")?;
        }
        write!(f, "===========================")
    }
}
