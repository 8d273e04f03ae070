use std::sync::Arc;

use chrono::Local;
use focusnoise_core::gamification::live_streak;
use focusnoise_core::{Config, FileStatsStore, Ledger};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let ledger = Ledger::new(
        config.ranks.clone(),
        config.session_settings().credit,
        Arc::new(FileStatsStore::open_default()?),
    );
    let mut stats = ledger.load_or_reset()?;
    let today = Local::now().date_naive();
    stats.current_streak_days =
        live_streak(stats.current_streak_days, stats.last_session_date, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total focus     {}", stats.focus_time_label());
    println!("Current streak  {}", stats.streak_label());
    println!("Longest streak  {} days", stats.longest_streak_days);
    println!(
        "Sessions        {} completed, {} aborted",
        stats.sessions_completed, stats.sessions_aborted
    );
    println!("Rank            {}", stats.rank);
    match ledger.ranks().next_tier(stats.total_hours()) {
        Some((tier, hours)) => println!("Next rank       {} in {hours:.1}h", tier.name),
        None => println!("Next rank       none, you are the daemon now"),
    }
    Ok(())
}
