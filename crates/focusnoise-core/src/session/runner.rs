//! Real-time session loop.
//!
//! Ticks the engine on a fixed interval, applies user controls as they
//! arrive, and records the result with a bounded write once the timer
//! finishes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{RenderBackend, SessionEngine};
use crate::audio::AudioBackend;
use crate::error::{PersistenceError, ReceiptError};
use crate::gamification::{Credit, Ledger, RankTransition, UserStats};
use crate::receipt::Receipt;
use crate::storage::WriteTicket;

/// A user action delivered to a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum Control {
    TogglePause,
    Pause,
    Resume,
    /// Add seconds to the session.
    Extend(u64),
    VolumeUp,
    VolumeDown,
    AddLayer(String),
    RemoveLayer(String),
    ToggleLayer(String),
    Cancel,
}

/// Run a session to completion or cancellation and return its receipt.
///
/// The engine is started if it is still idle. Controls are applied between
/// ticks; a closed control channel simply stops delivering controls.
///
/// # Errors
/// Only [`ReceiptError`] is returned. A failed or slow stats write is
/// reported on the receipt instead.
pub async fn run_session<B, R>(
    engine: &mut SessionEngine<B>,
    renderer: &mut R,
    controls: &mut mpsc::Receiver<Control>,
    ledger: &Ledger,
    stats: &mut UserStats,
) -> Result<Receipt, ReceiptError>
where
    B: AudioBackend,
    R: RenderBackend,
{
    engine.start();

    let mut ticker = tokio::time::interval(engine.settings().tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval fires immediately.
    ticker.tick().await;
    renderer.render(&engine.snapshot());

    let mut controls_open = true;
    while !engine.is_finished() {
        tokio::select! {
            biased;
            control = controls.recv(), if controls_open => match control {
                Some(control) => {
                    tracing::debug!(?control, "control");
                    engine.apply(control);
                    renderer.render(&engine.snapshot());
                }
                None => controls_open = false,
            },
            _ = ticker.tick() => {
                let frame = engine.tick();
                renderer.render(&frame);
            }
        }
    }

    let closing = engine.wind_down(ledger.policy())?;
    let recorded = match closing.credit {
        Some(credit) => {
            let today = Local::now().date_naive();
            let timeout = engine.settings().write_timeout;
            record_within(ledger, stats, credit, today, timeout)
                .await
                .map(Some)
        }
        None => Ok(None),
    };
    engine.close(closing, recorded, stats)
}

/// Like [`Ledger::record_session`], but the write runs on the blocking pool
/// and is abandoned after `timeout`. An abandoned write never reaches the
/// store, so `stats` and the store agree whatever the outcome.
pub async fn record_within(
    ledger: &Ledger,
    stats: &mut UserStats,
    credit: Credit,
    today: NaiveDate,
    timeout: Duration,
) -> Result<RankTransition, PersistenceError> {
    let Some((next, transition)) = ledger.prepare(stats, &credit, today) else {
        return Ok(RankTransition::unchanged(&stats.rank));
    };

    let store = ledger.store();
    let ticket = Arc::new(WriteTicket::new());
    let writer_ticket = Arc::clone(&ticket);
    let pending = next.clone();
    let mut write =
        tokio::task::spawn_blocking(move || store.save_with(&pending, &writer_ticket));

    let joined = match tokio::time::timeout(timeout, &mut write).await {
        Ok(joined) => joined,
        Err(_) if ticket.abandon() => {
            return Err(PersistenceError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
        // The writer is already committing; its result is the outcome.
        Err(_) => write.await,
    };

    match joined {
        Ok(Ok(())) => {
            ledger.commit(stats, next, &credit);
            Ok(transition)
        }
        Ok(Err(e)) => Err(e),
        Err(join) => Err(PersistenceError::WriterAborted(join.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::{CreditPolicy, RankTable};
    use crate::storage::{MemoryStatsStore, StatsStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn record_within_commits_on_success() {
        let store = Arc::new(MemoryStatsStore::new());
        let ledger = Ledger::new(RankTable::default(), CreditPolicy::default(), store.clone());
        let mut stats = UserStats::default();

        record_within(&ledger, &mut stats, Credit::completed(1800), today(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(stats.total_focus_seconds, 1800);
        assert_eq!(store.saved(), Some(stats));
    }

    #[tokio::test]
    async fn record_within_gives_up_on_slow_store() {
        let store = Arc::new(MemoryStatsStore::slow(Duration::from_millis(400)));
        let ledger = Ledger::new(RankTable::default(), CreditPolicy::default(), store);
        let mut stats = UserStats::default();

        let result = record_within(
            &ledger,
            &mut stats,
            Credit::completed(1800),
            today(),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(result, Err(PersistenceError::Timeout { timeout_ms: 20 })));
        assert_eq!(stats, UserStats::default());
    }

    #[tokio::test]
    async fn timed_out_write_never_lands() {
        let store = Arc::new(MemoryStatsStore::slow(Duration::from_millis(100)));
        let ledger = Ledger::new(RankTable::default(), CreditPolicy::default(), store.clone());
        let mut stats = UserStats::default();

        let result = record_within(
            &ledger,
            &mut stats,
            Credit::completed(1800),
            today(),
            Duration::from_millis(10),
        )
        .await;
        assert!(matches!(result, Err(PersistenceError::Timeout { .. })));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(stats.total_focus_seconds, 0);
        assert_eq!(store.saved(), None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn timed_out_file_write_keeps_previous_stats() {
        let dir = tempfile::tempdir().unwrap();
        let file = crate::storage::FileStatsStore::new(dir.path().join("stats.json"));
        let before = UserStats {
            total_focus_seconds: 120,
            ..Default::default()
        };
        file.save(&before).unwrap();

        // A zero timeout gives up before the blocking pool can commit.
        let ledger = Ledger::new(RankTable::default(), CreditPolicy::default(), Arc::new(file.clone()));
        let mut stats = before.clone();
        let result =
            record_within(&ledger, &mut stats, Credit::completed(600), today(), Duration::ZERO).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        match result {
            Ok(_) => assert_eq!(file.load().unwrap(), Some(stats)),
            Err(_) => {
                assert_eq!(stats, before);
                assert_eq!(file.load().unwrap(), Some(before));
            }
        }
    }

    #[tokio::test]
    async fn record_within_passes_store_errors_through() {
        let ledger = Ledger::new(
            RankTable::default(),
            CreditPolicy::default(),
            Arc::new(MemoryStatsStore::failing()),
        );
        let mut stats = UserStats::default();
        let result =
            record_within(&ledger, &mut stats, Credit::completed(60), today(), Duration::from_secs(5))
                .await;
        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
        assert_eq!(stats.total_focus_seconds, 0);
    }

    #[test]
    fn controls_serialize_tagged() {
        let json = serde_json::to_string(&Control::Extend(300)).unwrap();
        assert_eq!(json, r#"{"control":"extend","value":300}"#);
        let back: Control = serde_json::from_str(r#"{"control":"cancel"}"#).unwrap();
        assert_eq!(back, Control::Cancel);
    }
}
