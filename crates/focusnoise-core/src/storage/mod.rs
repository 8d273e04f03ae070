mod config;
pub mod stats;

pub use config::{AudioConfig, Config, PersistenceConfig, SessionConfig, SessionSettings, WeatherConfig};
pub use stats::{FileStatsStore, MemoryStatsStore, StatsStore, WriteTicket};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusnoise[-dev]/` based on FOCUSNOISE_ENV.
///
/// Set FOCUSNOISE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSNOISE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusnoise-dev")
    } else {
        base_dir.join("focusnoise")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
