//! # focusnoise core library
//!
//! Business logic for the focusnoise terminal focus companion. The CLI binary
//! is a thin shell over this crate: it wires a real audio backend, a
//! terminal renderer and stdin controls into the [`SessionEngine`].
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine; every transition returns an
//!   [`Event`] or `None` when it does not apply
//! - **Audio**: a catalog of sounds and a [`Mixer`] that keeps layer volumes
//!   in range and forwards commands to an [`AudioBackend`]
//! - **Weather**: a seedable random walk that makes the mix drift and
//!   schedules texture one-shots
//! - **Gamification**: the [`Ledger`] that credits sessions, keeps the daily
//!   streak and derives the rank
//! - **Storage**: TOML configuration and atomic JSON stats
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: drives timer, weather and mixer together
//! - [`run_session`]: async loop with controls and a bounded stats write
//! - [`Receipt`]: the end-of-session summary
//! - [`Config`]: application configuration management

pub mod audio;
pub mod error;
pub mod events;
pub mod gamification;
pub mod receipt;
pub mod session;
pub mod storage;
pub mod timer;
pub mod weather;

pub use audio::{AudioBackend, AudioCommand, Mixer, RecordingBackend, SoundCatalog, SoundLayer};
pub use error::{
    ConfigError, CoreError, MixerError, PersistenceError, ReceiptError, ValidationError,
};
pub use events::{Event, EventLog, EventSink};
pub use gamification::{Credit, CreditPolicy, Ledger, RankTable, RankTransition, UserStats};
pub use receipt::{Receipt, SessionOutcome};
pub use session::{run_session, Control, DisplaySnapshot, RenderBackend, SessionEngine};
pub use storage::{Config, FileStatsStore, MemoryStatsStore, SessionSettings, StatsStore};
pub use timer::{SessionTimer, TimerSnapshot, TimerState};
pub use weather::{WeatherFrequency, WeatherModulator, WeatherParams};
