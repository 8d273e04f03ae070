//! Gamification ledger.
//!
//! The ledger is the only code that mutates [`UserStats`]. A session is
//! turned into a [`Credit`] by the [`CreditPolicy`], and
//! [`Ledger::record_session`] applies it to a copy, persists the copy and
//! only then commits it. A failed write leaves the caller's stats untouched.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rank::RankTable;
use super::streak::next_streak;
use crate::error::PersistenceError;
use crate::storage::StatsStore;
use crate::timer::{TimerSnapshot, TimerState};

/// Cumulative stats, persisted across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub total_focus_seconds: u64,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub last_session_date: Option<NaiveDate>,
    pub rank: String,
    pub sessions_completed: u64,
    pub sessions_aborted: u64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_focus_seconds: 0,
            current_streak_days: 0,
            longest_streak_days: 0,
            last_session_date: None,
            rank: RankTable::default().rank_for(0.0).to_string(),
            sessions_completed: 0,
            sessions_aborted: 0,
        }
    }
}

impl UserStats {
    pub fn total_hours(&self) -> f64 {
        self.total_focus_seconds as f64 / 3600.0
    }

    /// "3h 25m"
    pub fn focus_time_label(&self) -> String {
        let hours = self.total_focus_seconds / 3600;
        let mins = (self.total_focus_seconds % 3600) / 60;
        format!("{hours}h {mins}m")
    }

    /// "1 Day", "4 Days"
    pub fn streak_label(&self) -> String {
        let n = self.current_streak_days;
        format!("{n} Day{}", if n == 1 { "" } else { "s" })
    }
}

/// What a session earns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub seconds: u64,
    pub completed: bool,
    /// Whether the session keeps the daily streak alive.
    pub counts_toward_streak: bool,
}

impl Credit {
    pub fn completed(seconds: u64) -> Self {
        Self {
            seconds,
            completed: true,
            counts_toward_streak: true,
        }
    }

    pub fn partial(seconds: u64, counts_toward_streak: bool) -> Self {
        Self {
            seconds,
            completed: false,
            counts_toward_streak,
        }
    }
}

/// How sessions are credited.
///
/// - Completed: full elapsed time, counts toward the streak.
/// - Aborted with time on the clock: elapsed time is added to the total;
///   it only counts toward the streak once `partial_credit_threshold_secs`
///   were reached.
/// - Aborted before the first second, or not finished: nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPolicy {
    pub partial_credit_threshold_secs: u64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            partial_credit_threshold_secs: 600,
        }
    }
}

impl CreditPolicy {
    pub fn credit_for(&self, timer: &TimerSnapshot) -> Option<Credit> {
        let elapsed = timer.elapsed_secs();
        match timer.state {
            TimerState::Completed if elapsed > 0 => Some(Credit::completed(elapsed)),
            TimerState::Aborted if elapsed > 0 => Some(Credit::partial(
                elapsed,
                elapsed >= self.partial_credit_threshold_secs,
            )),
            _ => None,
        }
    }
}

/// Rank before and after a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTransition {
    pub before: String,
    pub after: String,
}

impl RankTransition {
    pub fn unchanged(rank: &str) -> Self {
        Self {
            before: rank.to_string(),
            after: rank.to_string(),
        }
    }

    pub fn is_promotion(&self) -> bool {
        self.before != self.after
    }
}

pub struct Ledger {
    ranks: RankTable,
    policy: CreditPolicy,
    store: Arc<dyn StatsStore>,
}

impl Ledger {
    pub fn new(ranks: RankTable, policy: CreditPolicy, store: Arc<dyn StatsStore>) -> Self {
        Self {
            ranks,
            policy,
            store,
        }
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    pub fn store(&self) -> Arc<dyn StatsStore> {
        Arc::clone(&self.store)
    }

    /// Read stats from the store, falling back to defaults when nothing was
    /// saved yet. The rank is re-derived from the current table.
    pub fn load(&self) -> Result<UserStats, PersistenceError> {
        let mut stats = self.store.load()?.unwrap_or_default();
        stats.rank = self.ranks.rank_for(stats.total_hours()).to_string();
        Ok(stats)
    }

    /// Like [`load`](Self::load), but stats that no longer decode are set
    /// aside and replaced with [`fresh_stats`](Self::fresh_stats).
    ///
    /// # Errors
    /// Read failures, and an unreadable file that cannot be moved away.
    pub fn load_or_reset(&self) -> Result<UserStats, PersistenceError> {
        match self.load() {
            Err(PersistenceError::Encoding(error)) => {
                match self.store.set_aside()? {
                    Some(moved) => tracing::warn!(
                        %error,
                        moved_to = %moved.display(),
                        "stats file unreadable, starting fresh"
                    ),
                    None => tracing::warn!(%error, "stats unreadable, starting fresh"),
                }
                Ok(self.fresh_stats())
            }
            other => other,
        }
    }

    /// Apply a credit in memory only. Returns the rank transition.
    pub fn apply(&self, stats: &mut UserStats, credit: &Credit, today: NaiveDate) -> RankTransition {
        let before = self.ranks.rank_for(stats.total_hours()).to_string();

        stats.total_focus_seconds = stats.total_focus_seconds.saturating_add(credit.seconds);
        if credit.completed {
            stats.sessions_completed += 1;
        } else {
            stats.sessions_aborted += 1;
        }

        if credit.counts_toward_streak {
            stats.current_streak_days =
                next_streak(stats.current_streak_days, stats.last_session_date, today);
            stats.longest_streak_days = stats.longest_streak_days.max(stats.current_streak_days);
            stats.last_session_date = Some(today);
        }

        let after = self.ranks.rank_for(stats.total_hours()).to_string();
        stats.rank = after.clone();
        RankTransition { before, after }
    }

    /// Apply `credit` to a copy of `stats`. `None` when there is nothing to
    /// record.
    pub fn prepare(
        &self,
        stats: &UserStats,
        credit: &Credit,
        today: NaiveDate,
    ) -> Option<(UserStats, RankTransition)> {
        if credit.seconds == 0 {
            return None;
        }
        let mut next = stats.clone();
        let transition = self.apply(&mut next, credit, today);
        Some((next, transition))
    }

    /// Make a persisted copy from [`Ledger::prepare`] the caller's stats.
    pub fn commit(&self, stats: &mut UserStats, next: UserStats, credit: &Credit) {
        *stats = next;
        tracing::info!(
            credited_secs = credit.seconds,
            total_secs = stats.total_focus_seconds,
            streak = stats.current_streak_days,
            rank = %stats.rank,
            "session recorded"
        );
    }

    /// Credit a session and persist the result.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the store cannot be written; `stats`
    /// is left exactly as it was.
    pub fn record_session(
        &self,
        stats: &mut UserStats,
        credit: Credit,
        today: NaiveDate,
    ) -> Result<RankTransition, PersistenceError> {
        let Some((next, transition)) = self.prepare(stats, &credit, today) else {
            return Ok(RankTransition::unchanged(&stats.rank));
        };
        self.store.save(&next)?;
        self.commit(stats, next, &credit);
        Ok(transition)
    }

    /// Fresh stats for a first run or after an unreadable stats file.
    pub fn fresh_stats(&self) -> UserStats {
        UserStats {
            rank: self.ranks.rank_for(0.0).to_string(),
            ..UserStats::default()
        }
    }
}
