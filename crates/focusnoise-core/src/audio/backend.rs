use serde::{Deserialize, Serialize};

/// A command issued to the audio backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AudioCommand {
    /// Start looping a layer.
    Play { layer_id: String },
    /// Stop a looping layer.
    Stop { layer_id: String },
    SetVolume { layer_id: String, volume: f64 },
    /// Fire a non-looping sound (texture or sound effect).
    PlayOnce { sound_id: String, volume: f64 },
}

/// Every audio output implements this trait.
///
/// Calls are fire-and-forget: the backend owns decoding, mixing and devices
/// in its own execution context and must not block the caller.
pub trait AudioBackend {
    fn play(&mut self, layer_id: &str);

    fn stop(&mut self, layer_id: &str);

    fn set_volume(&mut self, layer_id: &str, volume: f64);

    fn play_once(&mut self, _sound_id: &str, _volume: f64) {
        // default no-op
    }

    fn dispatch(&mut self, command: &AudioCommand) {
        match command {
            AudioCommand::Play { layer_id } => self.play(layer_id),
            AudioCommand::Stop { layer_id } => self.stop(layer_id),
            AudioCommand::SetVolume { layer_id, volume } => self.set_volume(layer_id, *volume),
            AudioCommand::PlayOnce { sound_id, volume } => self.play_once(sound_id, *volume),
        }
    }
}

/// Backend that only remembers what it was told. Useful for headless runs
/// and for asserting on issued commands.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    commands: Vec<AudioCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[AudioCommand] {
        &self.commands
    }

    /// Last volume sent for a layer, if any.
    pub fn last_volume(&self, layer_id: &str) -> Option<f64> {
        self.commands.iter().rev().find_map(|c| match c {
            AudioCommand::SetVolume { layer_id: id, volume } if id == layer_id => Some(*volume),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl AudioBackend for RecordingBackend {
    fn play(&mut self, layer_id: &str) {
        self.commands.push(AudioCommand::Play {
            layer_id: layer_id.to_string(),
        });
    }

    fn stop(&mut self, layer_id: &str) {
        self.commands.push(AudioCommand::Stop {
            layer_id: layer_id.to_string(),
        });
    }

    fn set_volume(&mut self, layer_id: &str, volume: f64) {
        self.commands.push(AudioCommand::SetVolume {
            layer_id: layer_id.to_string(),
            volume,
        });
    }

    fn play_once(&mut self, sound_id: &str, volume: f64) {
        self.commands.push(AudioCommand::PlayOnce {
            sound_id: sound_id.to_string(),
            volume,
        });
    }
}
