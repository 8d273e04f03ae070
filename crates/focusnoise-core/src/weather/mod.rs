//! Dynamic weather.
//!
//! The modulator is stepped once per timer tick. Each step nudges a global
//! intensity with a bounded random walk and derives a small per-layer volume
//! delta from it, so the mix drifts without audible jumps. It also schedules
//! texture one-shots at random intervals picked from the frequency level.
//!
//! All randomness comes from a seedable PCG so a fixed seed replays the same
//! weather.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

/// How often texture one-shots play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherFrequency {
    Low,
    #[default]
    Medium,
    High,
}

impl WeatherFrequency {
    /// Interval bounds in seconds between two textures.
    pub fn interval_range(&self) -> (u64, u64) {
        match self {
            WeatherFrequency::Low => (60, 120),
            WeatherFrequency::Medium => (30, 90),
            WeatherFrequency::High => (15, 45),
        }
    }
}

impl std::str::FromStr for WeatherFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(WeatherFrequency::Low),
            "medium" => Ok(WeatherFrequency::Medium),
            "high" => Ok(WeatherFrequency::High),
            other => Err(format!("unknown weather frequency '{other}'")),
        }
    }
}

/// Tunables for the random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherParams {
    pub frequency: WeatherFrequency,
    /// Largest intensity change per tick.
    pub noise_step: f64,
    /// Largest per-layer volume delta per tick at full intensity.
    pub layer_step: f64,
}

impl Default for WeatherParams {
    fn default() -> Self {
        Self {
            frequency: WeatherFrequency::Medium,
            noise_step: 0.05,
            layer_step: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    /// 0.0 (calm) .. 1.0 (stormy)
    pub intensity: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDelta {
    pub layer_id: String,
    pub delta: f64,
}

/// A texture one-shot to fire on this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureCue {
    pub sound_id: String,
    /// Fraction of the master volume, within [0.3, 0.6].
    pub relative_volume: f64,
}

/// Output of one modulator step, consumed by the mixer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Perturbation {
    pub intensity: f64,
    pub deltas: Vec<LayerDelta>,
    pub texture: Option<TextureCue>,
}

pub struct WeatherModulator {
    params: WeatherParams,
    state: WeatherState,
    rng: Mcg128Xsl64,
    ticks_until_texture: u64,
}

impl WeatherModulator {
    /// Create a modulator. `seed = None` draws the seed from OS entropy.
    pub fn new(params: WeatherParams, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let ticks_until_texture = next_interval(&mut rng, params.frequency);
        Self {
            params,
            state: WeatherState {
                intensity: 0.5,
                last_update: Utc::now(),
            },
            rng,
            ticks_until_texture,
        }
    }

    pub fn state(&self) -> WeatherState {
        self.state
    }

    pub fn intensity(&self) -> f64 {
        self.state.intensity
    }

    pub fn params(&self) -> WeatherParams {
        self.params
    }

    pub fn ticks_until_texture(&self) -> u64 {
        self.ticks_until_texture
    }

    /// Change the texture frequency. Takes effect from the next texture.
    pub fn set_frequency(&mut self, frequency: WeatherFrequency) {
        self.params.frequency = frequency;
    }

    /// Step the weather by one tick.
    ///
    /// `layers` are the ids of currently active layers; `texture_pool` holds
    /// the textures linked to them. An empty pool never yields a cue.
    pub fn advance(
        &mut self,
        layers: &[String],
        texture_pool: &[String],
        now: DateTime<Utc>,
    ) -> Perturbation {
        let noise = self.rng.gen_range(-1.0..=1.0) * self.params.noise_step;
        self.state.intensity = (self.state.intensity + noise).clamp(0.0, 1.0);
        self.state.last_update = now;

        let scale = self.params.layer_step * self.state.intensity;
        let deltas = layers
            .iter()
            .map(|id| LayerDelta {
                layer_id: id.clone(),
                delta: self.rng.gen_range(-1.0..=1.0) * scale,
            })
            .collect();

        self.ticks_until_texture = self.ticks_until_texture.saturating_sub(1);
        let texture = if self.ticks_until_texture == 0 {
            self.ticks_until_texture = next_interval(&mut self.rng, self.params.frequency);
            texture_pool.choose(&mut self.rng).cloned().map(|sound_id| TextureCue {
                sound_id,
                relative_volume: self.rng.gen_range(0.3..=0.6),
            })
        } else {
            None
        };

        tracing::trace!(intensity = self.state.intensity, "weather advanced");

        Perturbation {
            intensity: self.state.intensity,
            deltas,
            texture,
        }
    }
}

fn next_interval(rng: &mut Mcg128Xsl64, frequency: WeatherFrequency) -> u64 {
    let (lo, hi) = frequency.interval_range();
    rng.gen_range(lo..=hi)
}
