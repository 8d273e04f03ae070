//! Session engine.
//!
//! Ties the timer, the weather modulator and the mixer together. The engine
//! is driven one tick at a time; it never sleeps, draws or reads input. The
//! async loop that drives it in real time lives in [`runner`].

pub mod runner;

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioBackend, Mixer, SoundCatalog};
use crate::error::{MixerError, PersistenceError, ReceiptError, ValidationError};
use crate::events::{Event, EventSink};
use crate::gamification::{Credit, CreditPolicy, Ledger, RankTransition, UserStats};
use crate::receipt::Receipt;
use crate::storage::SessionSettings;
use crate::timer::{SessionTimer, TimerSnapshot, TimerState};
use crate::weather::WeatherModulator;

pub use runner::{run_session, Control};

/// What the rendering backend needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub state: TimerState,
    pub remaining_secs: u64,
    pub total_secs: u64,
    /// Display names of the audible layers.
    pub active_layers: Vec<String>,
    pub weather_intensity: f64,
    pub master_volume: f64,
}

impl DisplaySnapshot {
    /// 0.0 .. 1.0
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        1.0 - self.remaining_secs as f64 / self.total_secs as f64
    }
}

/// Receives a display snapshot on every tick.
pub trait RenderBackend {
    fn render(&mut self, snapshot: &DisplaySnapshot);
}

/// Audio has stopped and the session is waiting for the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Closing {
    pub timer: TimerSnapshot,
    pub layers: BTreeSet<String>,
    pub credit: Option<Credit>,
}

pub struct SessionEngine<B: AudioBackend> {
    settings: SessionSettings,
    timer: SessionTimer,
    weather: WeatherModulator,
    mixer: Mixer<B>,
    observers: Vec<Box<dyn EventSink>>,
    closed: bool,
}

impl<B: AudioBackend> SessionEngine<B> {
    /// Create an idle session of `total_secs`.
    ///
    /// # Errors
    /// Returns an error for a zero-length session.
    pub fn new(
        settings: SessionSettings,
        catalog: SoundCatalog,
        backend: B,
        total_secs: u64,
    ) -> Result<Self, ValidationError> {
        let timer = SessionTimer::new(total_secs)?;
        let weather = WeatherModulator::new(settings.weather, settings.weather_seed);
        let mut mixer = Mixer::new(catalog, backend)
            .with_default_volume(settings.layer_volume)
            .with_weather_swing(settings.weather_swing);
        mixer.set_master_volume(settings.master_volume);

        Ok(Self {
            settings,
            timer,
            weather,
            mixer,
            observers: Vec::new(),
            closed: false,
        })
    }

    /// Register an observer for every subsequent event.
    pub fn observe(&mut self, sink: impl EventSink + 'static) {
        self.observers.push(Box::new(sink));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn mixer(&self) -> &Mixer<B> {
        &self.mixer
    }

    pub fn weather(&self) -> &WeatherModulator {
        &self.weather
    }

    pub fn is_finished(&self) -> bool {
        self.timer.state().is_terminal()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            state: self.timer.state(),
            remaining_secs: self.timer.remaining_secs(),
            total_secs: self.timer.total_secs(),
            active_layers: self.mixer.active_layers().map(|l| l.name.clone()).collect(),
            weather_intensity: self.weather.intensity(),
            master_volume: self.mixer.master_volume(),
        }
    }

    // ── Layers ───────────────────────────────────────────────────────

    pub fn add_layer(&mut self, sound_id: &str) -> Result<(), MixerError> {
        let result = self.mixer.add_layer(sound_id).map(|l| Event::LayerAdded {
            layer_id: l.id.clone(),
            name: l.name.clone(),
        });
        match result {
            Ok(event) => {
                self.emit(event);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "layer rejected");
                Err(e)
            }
        }
    }

    pub fn remove_layer(&mut self, sound_id: &str) -> Result<(), MixerError> {
        let layer = self.mixer.remove_layer(sound_id)?;
        self.emit(Event::LayerRemoved { layer_id: layer.id });
        Ok(())
    }

    /// Mute an audible layer or unmute a silent one.
    pub fn toggle_layer(&mut self, sound_id: &str) -> Result<bool, MixerError> {
        let active = !self
            .mixer
            .layer(sound_id)
            .map(|l| l.active)
            .ok_or_else(|| MixerError::LayerNotFound {
                id: sound_id.to_string(),
            })?;
        self.mixer.set_active(sound_id, active)?;
        self.emit(Event::LayerToggled {
            layer_id: sound_id.to_string(),
            active,
        });
        Ok(active)
    }

    pub fn set_layer_volume(&mut self, sound_id: &str, volume: f64) -> Result<f64, MixerError> {
        self.mixer.set_volume(sound_id, volume)
    }

    pub fn volume_up(&mut self) -> f64 {
        self.nudge_volume(self.settings.volume_step)
    }

    pub fn volume_down(&mut self) -> f64 {
        self.nudge_volume(-self.settings.volume_step)
    }

    fn nudge_volume(&mut self, step: f64) -> f64 {
        let volume = self.mixer.nudge_master_volume(step);
        self.emit(Event::MasterVolumeChanged { volume });
        volume
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start(&mut self) -> bool {
        let event = self.timer.start();
        self.emit_opt(event)
    }

    pub fn pause(&mut self) -> bool {
        let event = self.timer.pause();
        self.emit_opt(event)
    }

    pub fn resume(&mut self) -> bool {
        let event = self.timer.resume();
        self.emit_opt(event)
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.timer.state() {
            TimerState::Running => self.pause(),
            TimerState::Paused => self.resume(),
            _ => false,
        }
    }

    pub fn extend(&mut self, secs: u64) -> bool {
        let event = self.timer.extend(secs);
        self.emit_opt(event)
    }

    pub fn cancel(&mut self) -> bool {
        let event = self.timer.cancel();
        self.emit_opt(event)
    }

    /// Advance one tick: count down, move the weather, update the mix, and
    /// return the frame to draw. Outside `Running` nothing moves.
    pub fn tick(&mut self) -> DisplaySnapshot {
        if self.timer.state() != TimerState::Running {
            return self.snapshot();
        }

        let completed = self.timer.tick();

        let perturbation = self.weather.advance(
            &self.mixer.active_ids(),
            &self.mixer.texture_pool(),
            Utc::now(),
        );
        self.mixer.tick(&perturbation);

        tracing::debug!(
            remaining = self.timer.remaining_secs(),
            intensity = perturbation.intensity,
            "tick"
        );
        self.emit(Event::Tick {
            remaining_secs: self.timer.remaining_secs(),
            weather_intensity: perturbation.intensity,
            at: Utc::now(),
        });
        if let Some(cue) = perturbation.texture.filter(|_| !self.mixer.is_output_paused()) {
            self.emit(Event::TexturePlayed {
                volume: cue.relative_volume * self.mixer.master_volume(),
                sound_id: cue.sound_id,
            });
        }
        self.emit_opt(completed);

        self.snapshot()
    }

    /// Apply a control coming from the user.
    pub fn apply(&mut self, control: Control) -> bool {
        match control {
            Control::TogglePause => self.toggle_pause(),
            Control::Pause => self.pause(),
            Control::Resume => self.resume(),
            Control::Extend(secs) => self.extend(secs),
            Control::VolumeUp => {
                self.volume_up();
                true
            }
            Control::VolumeDown => {
                self.volume_down();
                true
            }
            Control::AddLayer(id) => self.add_layer(&id).is_ok(),
            Control::RemoveLayer(id) => self.remove_layer(&id).is_ok(),
            Control::ToggleLayer(id) => self.toggle_layer(&id).is_ok(),
            Control::Cancel => self.cancel(),
        }
    }

    // ── Finishing ────────────────────────────────────────────────────

    /// Stop the audio and work out what the session earns. Can only happen
    /// once, after the timer reached a terminal state.
    pub fn wind_down(&mut self, policy: &CreditPolicy) -> Result<Closing, ReceiptError> {
        if !self.is_finished() {
            return Err(ReceiptError::InvalidSession(format!(
                "session is still {:?}",
                self.timer.state()
            )));
        }
        if self.closed {
            return Err(ReceiptError::InvalidSession(
                "session was already closed".into(),
            ));
        }
        self.closed = true;

        let layers: BTreeSet<String> =
            self.mixer.active_layers().map(|l| l.name.clone()).collect();
        self.mixer.stop_all();
        if self.timer.state() == TimerState::Completed {
            self.mixer.play_sfx("gong");
        }

        let timer = self.timer.snapshot();
        Ok(Closing {
            timer,
            layers,
            credit: policy.credit_for(&timer),
        })
    }

    /// Turn the ledger's answer into a receipt.
    pub fn close(
        &mut self,
        closing: Closing,
        recorded: Result<Option<RankTransition>, PersistenceError>,
        stats: &UserStats,
    ) -> Result<Receipt, ReceiptError> {
        let (transition, saved) = match recorded {
            Ok(Some(transition)) => {
                self.emit(Event::StatsRecorded {
                    credited_secs: closing.credit.map(|c| c.seconds).unwrap_or(0),
                    rank_before: transition.before.clone(),
                    rank_after: transition.after.clone(),
                    streak_days: stats.current_streak_days,
                    at: Utc::now(),
                });
                (transition, true)
            }
            Ok(None) => (RankTransition::unchanged(&stats.rank), true),
            Err(e) => {
                tracing::warn!(error = %e, "stats not saved");
                self.emit(Event::StatsNotSaved {
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                (RankTransition::unchanged(&stats.rank), false)
            }
        };

        Receipt::generate(
            &closing.timer,
            closing.layers,
            &transition,
            stats.current_streak_days,
            saved,
        )
    }

    /// Wind down, credit the ledger synchronously and build the receipt.
    /// A persistence failure is reported on the receipt, not returned.
    pub fn finish(
        &mut self,
        ledger: &Ledger,
        stats: &mut UserStats,
        today: NaiveDate,
    ) -> Result<Receipt, ReceiptError> {
        let closing = self.wind_down(ledger.policy())?;
        let recorded = match closing.credit {
            Some(credit) => ledger.record_session(stats, credit, today).map(Some),
            None => Ok(None),
        };
        self.close(closing, recorded, stats)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&mut self, event: Event) {
        for sink in &mut self.observers {
            sink.emit(&event);
        }
    }

    fn emit_opt(&mut self, event: Option<Event>) -> bool {
        match event {
            Some(event) => {
                self.emit(event);
                true
            }
            None => false,
        }
    }
}
