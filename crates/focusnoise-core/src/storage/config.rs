//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default session length and tick interval
//! - Partial-credit threshold for cancelled sessions
//! - Master/layer volume and the volume key step
//! - Weather frequency, random-walk tuning and an optional fixed seed
//! - The rank table
//!
//! Configuration is stored at `~/.config/focusnoise/config.toml`.
//! The engine never reads it directly: [`Config::session_settings`] produces
//! an immutable [`SessionSettings`] snapshot that is passed in explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::gamification::{CreditPolicy, RankTable};
use crate::weather::{WeatherFrequency, WeatherParams};

/// Session-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_minutes")]
    pub default_minutes: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_partial_credit_threshold_secs")]
    pub partial_credit_threshold_secs: u64,
}

/// Audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_one")]
    pub master_volume: f64,
    #[serde(default = "default_layer_volume")]
    pub layer_volume: f64,
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,
    /// Directory scanned for loops instead of the built-in catalog.
    #[serde(default)]
    pub assets_dir: Option<String>,
}

/// Weather configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub frequency: WeatherFrequency,
    #[serde(default = "default_noise_step")]
    pub noise_step: f64,
    #[serde(default = "default_layer_step")]
    pub layer_step: f64,
    #[serde(default = "default_max_swing")]
    pub max_swing: f64,
    /// Fixed seed for reproducible weather.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusnoise/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub ranks: RankTable,
}

/// Immutable settings for one session, derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub master_volume: f64,
    pub layer_volume: f64,
    pub volume_step: f64,
    pub weather: WeatherParams,
    pub weather_swing: f64,
    pub weather_seed: Option<u64>,
    pub credit: CreditPolicy,
    pub write_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Config::default().session_settings()
    }
}

// Default functions
fn default_minutes() -> u64 {
    25
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_partial_credit_threshold_secs() -> u64 {
    600
}
fn default_one() -> f64 {
    1.0
}
fn default_layer_volume() -> f64 {
    0.8
}
fn default_volume_step() -> f64 {
    0.05
}
fn default_noise_step() -> f64 {
    0.05
}
fn default_layer_step() -> f64 {
    0.02
}
fn default_max_swing() -> f64 {
    0.15
}
fn default_write_timeout_ms() -> u64 {
    2000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
            partial_credit_threshold_secs: default_partial_credit_threshold_secs(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            layer_volume: default_layer_volume(),
            volume_step: default_volume_step(),
            assets_dir: None,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            frequency: WeatherFrequency::Medium,
            noise_step: default_noise_step(),
            layer_step: default_layer_step(),
            max_swing: default_max_swing(),
            seed: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            weather: WeatherConfig::default(),
            persistence: PersistenceConfig::default(),
            ranks: RankTable::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optionals accept a number or fall back to a string.
                    serde_json::Value::Null => parse_number(value)
                        .unwrap_or_else(|| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `~/.config/focusnoise/config.toml`
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if the key is
    /// unknown or the resulting config does not deserialize.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tick_interval: Duration::from_millis(self.session.tick_interval_ms.max(1)),
            master_volume: finite_or(self.audio.master_volume, default_one()).clamp(0.0, 1.0),
            layer_volume: finite_or(self.audio.layer_volume, default_layer_volume())
                .clamp(0.0, 1.0),
            volume_step: finite_or(self.audio.volume_step, default_volume_step()).abs(),
            weather: WeatherParams {
                frequency: self.weather.frequency,
                noise_step: finite_or(self.weather.noise_step, default_noise_step()).abs(),
                layer_step: finite_or(self.weather.layer_step, default_layer_step()).abs(),
            },
            weather_swing: finite_or(self.weather.max_swing, default_max_swing()).abs(),
            weather_seed: self.weather.seed,
            credit: CreditPolicy {
                partial_credit_threshold_secs: self.session.partial_credit_threshold_secs,
            },
            write_timeout: Duration::from_millis(self.persistence.write_timeout_ms),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

/// `nan` and `inf` are valid TOML floats but meaningless as volumes or steps.
fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}
