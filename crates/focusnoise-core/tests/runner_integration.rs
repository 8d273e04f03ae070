//! Integration tests for the async session loop.

use std::sync::Arc;
use std::time::Duration;

use focusnoise_core::{
    run_session, Control, DisplaySnapshot, Ledger, MemoryStatsStore, RankTable, RecordingBackend,
    RenderBackend, SessionEngine, SessionOutcome, SessionSettings, SoundCatalog, TimerState,
    UserStats,
};
use tokio::sync::mpsc;

#[derive(Default)]
struct Frames(Vec<DisplaySnapshot>);

impl RenderBackend for Frames {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        self.0.push(snapshot.clone());
    }
}

fn fast_settings() -> SessionSettings {
    SessionSettings {
        tick_interval: Duration::from_millis(5),
        weather_seed: Some(7),
        ..SessionSettings::default()
    }
}

fn engine(settings: SessionSettings, secs: u64) -> SessionEngine<RecordingBackend> {
    let mut engine =
        SessionEngine::new(settings, SoundCatalog::builtin(), RecordingBackend::new(), secs).unwrap();
    engine.add_layer("rain").unwrap();
    engine
}

fn ledger(store: Arc<MemoryStatsStore>) -> Ledger {
    Ledger::new(RankTable::default(), Default::default(), store)
}

#[tokio::test]
async fn test_session_runs_to_completion() {
    let store = Arc::new(MemoryStatsStore::new());
    let ledger = ledger(store.clone());
    let mut stats = UserStats::default();
    let mut engine = engine(fast_settings(), 3);
    let mut frames = Frames::default();
    let (_tx, mut rx) = mpsc::channel(8);

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();

    assert_eq!(receipt.outcome(), SessionOutcome::Completed);
    assert_eq!(receipt.session_duration_secs(), 3);
    assert!(receipt.stats_saved());
    assert_eq!(stats.total_focus_seconds, 3);
    assert_eq!(store.saved().unwrap().total_focus_seconds, 3);

    let remaining: Vec<u64> = frames.0.iter().map(|f| f.remaining_secs).collect();
    assert_eq!(remaining, vec![3, 2, 1, 0]);
    assert_eq!(frames.0.last().unwrap().state, TimerState::Completed);
}

#[tokio::test]
async fn test_cancel_before_first_tick() {
    let store = Arc::new(MemoryStatsStore::new());
    let ledger = ledger(store.clone());
    let mut stats = UserStats::default();
    let mut engine = engine(fast_settings(), 60);
    let mut frames = Frames::default();
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(Control::Cancel).await.unwrap();

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();

    assert_eq!(receipt.outcome(), SessionOutcome::Aborted);
    assert_eq!(receipt.session_duration_secs(), 0);
    assert_eq!(stats, UserStats::default());
    assert!(store.saved().is_none());
}

#[tokio::test]
async fn test_controls_apply_between_ticks() {
    let ledger = ledger(Arc::new(MemoryStatsStore::new()));
    let mut stats = UserStats::default();
    let mut engine = engine(fast_settings(), 60);
    let mut frames = Frames::default();
    let (tx, mut rx) = mpsc::channel(8);
    for control in [
        Control::Pause,
        Control::Extend(30),
        Control::VolumeDown,
        Control::Cancel,
    ] {
        tx.send(control).await.unwrap();
    }

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();

    assert_eq!(receipt.outcome(), SessionOutcome::Aborted);
    assert_eq!(receipt.planned_secs(), 90);
    assert!(frames.0.iter().any(|f| f.state == TimerState::Paused));
    assert!(engine.mixer().master_volume() < 1.0);
}

#[tokio::test]
async fn test_closed_control_channel_does_not_stop_session() {
    let ledger = ledger(Arc::new(MemoryStatsStore::new()));
    let mut stats = UserStats::default();
    let mut engine = engine(fast_settings(), 2);
    let mut frames = Frames::default();
    let (tx, mut rx) = mpsc::channel::<Control>(1);
    drop(tx);

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();
    assert_eq!(receipt.outcome(), SessionOutcome::Completed);
}

#[tokio::test]
async fn test_slow_store_times_out_without_touching_stats() {
    let store = Arc::new(MemoryStatsStore::slow(Duration::from_millis(400)));
    let ledger = ledger(store.clone());
    let mut stats = UserStats::default();
    let settings = SessionSettings {
        write_timeout: Duration::from_millis(20),
        ..fast_settings()
    };
    let mut engine = engine(settings, 2);
    let mut frames = Frames::default();
    let (_tx, mut rx) = mpsc::channel(1);

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();

    assert_eq!(receipt.outcome(), SessionOutcome::Completed);
    assert!(!receipt.stats_saved());
    assert!(!receipt.ranked_up());
    assert_eq!(stats, UserStats::default());

    // The abandoned write must not land once the store wakes up.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(store.saved(), None);
}

#[tokio::test]
async fn test_failing_store_still_produces_receipt() {
    let ledger = ledger(Arc::new(MemoryStatsStore::failing()));
    let mut stats = UserStats::default();
    let mut engine = engine(fast_settings(), 1);
    let mut frames = Frames::default();
    let (_tx, mut rx) = mpsc::channel(1);

    let receipt = run_session(&mut engine, &mut frames, &mut rx, &ledger, &mut stats)
        .await
        .unwrap();
    assert!(!receipt.stats_saved());
    assert!(receipt.to_string().contains("not saved"));
}
