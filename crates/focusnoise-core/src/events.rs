use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change in a session produces an Event.
/// Observers (log lines, easter eggs, integrations) subscribe through
/// [`EventSink`]; the engine never formats output itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerExtended {
        added_secs: u64,
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerAborted {
        elapsed_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// One second of focus went by.
    Tick {
        remaining_secs: u64,
        weather_intensity: f64,
        at: DateTime<Utc>,
    },
    LayerAdded {
        layer_id: String,
        name: String,
    },
    LayerRemoved {
        layer_id: String,
    },
    LayerToggled {
        layer_id: String,
        active: bool,
    },
    MasterVolumeChanged {
        volume: f64,
    },
    TexturePlayed {
        sound_id: String,
        volume: f64,
    },
    /// The ledger accepted the session.
    StatsRecorded {
        credited_secs: u64,
        rank_before: String,
        rank_after: String,
        streak_days: u32,
        at: DateTime<Utc>,
    },
    /// The ledger could not persist; stats were left as they were.
    StatsNotSaved {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::TimerCompleted { .. } | Event::TimerAborted { .. })
    }
}

/// Receives every event the engine emits.
pub trait EventSink {
    fn emit(&mut self, event: &Event);
}

/// Sink that keeps events in memory; clones share the same buffer so a test
/// can hand one clone to the engine and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: std::sync::Arc<std::sync::Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count_where(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
