//! Calendar-day streaks.

use chrono::NaiveDate;

/// Streak after a qualifying session on `today`.
///
/// - last session yesterday: streak + 1
/// - last session today: unchanged
/// - anything else (no history, a gap, or a date in the future): 1
pub fn next_streak(current: u32, last_session: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last) = last_session else {
        return 1;
    };
    match (today - last).num_days() {
        0 => current.max(1),
        1 => current.saturating_add(1),
        _ => 1,
    }
}

/// Streak as it should be displayed on `today`: a streak whose last session
/// is older than yesterday is already broken.
pub fn live_streak(current: u32, last_session: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_session {
        Some(last) if (0..=1).contains(&(today - last).num_days()) => current,
        _ => 0,
    }
}
