//! Ranks, streaks and the ledger that keeps cumulative focus time.

mod ledger;
mod rank;
mod streak;

pub use ledger::{Credit, CreditPolicy, Ledger, RankTransition, UserStats};
pub use rank::{RankTable, RankTier};
pub use streak::{live_streak, next_streak};
