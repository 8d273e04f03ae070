//! Audio layer mixer.
//!
//! Holds the logical state of every layer in the mix and turns changes into
//! backend commands. The effective volume sent to the backend is
//!
//! ```text
//! clamp(base_volume + weather_offset, 0, 1) * master_volume
//! ```
//!
//! where the weather offset is the accumulated perturbation, bounded to
//! `±weather_swing`.

use serde::{Deserialize, Serialize};

use super::backend::AudioBackend;
use super::catalog::{SoundCatalog, SoundCategory};
use crate::error::MixerError;
use crate::weather::{Perturbation, TextureCue};

const DEFAULT_WEATHER_SWING: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundLayer {
    pub id: String,
    pub name: String,
    pub category: SoundCategory,
    /// User-chosen volume, 0.0 ..= 1.0.
    pub base_volume: f64,
    pub active: bool,
    /// Drift applied by the weather, within `±weather_swing`.
    #[serde(default)]
    pub weather_offset: f64,
}

impl SoundLayer {
    pub fn effective_volume(&self, master: f64) -> f64 {
        (self.base_volume + self.weather_offset).clamp(0.0, 1.0) * master
    }
}

pub struct Mixer<B: AudioBackend> {
    catalog: SoundCatalog,
    backend: B,
    layers: Vec<SoundLayer>,
    master_volume: f64,
    default_volume: f64,
    weather_swing: f64,
}

impl<B: AudioBackend> Mixer<B> {
    pub fn new(catalog: SoundCatalog, backend: B) -> Self {
        Self {
            catalog,
            backend,
            layers: Vec::new(),
            master_volume: 1.0,
            default_volume: 1.0,
            weather_swing: DEFAULT_WEATHER_SWING,
        }
    }

    /// Volume given to newly added layers.
    pub fn with_default_volume(mut self, volume: f64) -> Self {
        self.default_volume = clamp_unit(volume);
        self
    }

    /// Bound on the accumulated weather offset per layer.
    pub fn with_weather_swing(mut self, swing: f64) -> Self {
        self.weather_swing = swing.abs().min(1.0);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn layers(&self) -> &[SoundLayer] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&SoundLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn active_layers(&self) -> impl Iterator<Item = &SoundLayer> {
        self.layers.iter().filter(|l| l.active)
    }

    pub fn active_count(&self) -> usize {
        self.active_layers().count()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active_layers().map(|l| l.id.clone()).collect()
    }

    /// Display names of every layer currently in the mix.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    /// No active layer means silence, but the session keeps going.
    pub fn is_output_paused(&self) -> bool {
        self.active_count() == 0
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Textures linked to the active layers, without duplicates.
    pub fn texture_pool(&self) -> Vec<String> {
        let mut pool: Vec<String> = Vec::new();
        for layer in self.active_layers() {
            if let Some(def) = self.catalog.get(&layer.id) {
                for texture in &def.textures {
                    if !pool.contains(texture) {
                        pool.push(texture.clone());
                    }
                }
            }
        }
        pool
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add a layer from the catalog and start it. Adding a layer already in
    /// the mix leaves it untouched.
    pub fn add_layer(&mut self, sound_id: &str) -> Result<&SoundLayer, MixerError> {
        let def = self.catalog.get(sound_id).ok_or_else(|| MixerError::UnknownSound {
            id: sound_id.to_string(),
        })?;

        if let Some(index) = self.index_of(sound_id) {
            return Ok(&self.layers[index]);
        }

        let layer = SoundLayer {
            id: def.id.clone(),
            name: def.name.clone(),
            category: def.category,
            base_volume: self.default_volume,
            active: true,
            weather_offset: 0.0,
        };
        self.backend.play(&layer.id);
        self.backend
            .set_volume(&layer.id, layer.effective_volume(self.master_volume));
        tracing::debug!(layer = %layer.id, "layer added");
        self.layers.push(layer);

        let last = self.layers.len() - 1;
        Ok(&self.layers[last])
    }

    pub fn remove_layer(&mut self, sound_id: &str) -> Result<SoundLayer, MixerError> {
        let index = self.require(sound_id)?;
        let layer = self.layers.remove(index);
        if layer.active {
            self.backend.stop(&layer.id);
        }
        if self.is_output_paused() {
            tracing::debug!("mix is silent");
        }
        Ok(layer)
    }

    /// Mute or unmute a layer while keeping it in the mix.
    pub fn set_active(&mut self, sound_id: &str, active: bool) -> Result<(), MixerError> {
        let index = self.require(sound_id)?;
        if self.layers[index].active == active {
            return Ok(());
        }
        self.layers[index].active = active;
        let id = self.layers[index].id.clone();
        if active {
            self.backend.play(&id);
            self.push_volume(index);
        } else {
            self.backend.stop(&id);
        }
        Ok(())
    }

    /// Set a layer's base volume, clamped to [0, 1]. Returns the stored value.
    pub fn set_volume(&mut self, sound_id: &str, volume: f64) -> Result<f64, MixerError> {
        let index = self.require(sound_id)?;
        self.layers[index].base_volume = clamp_unit(volume);
        self.push_volume(index);
        Ok(self.layers[index].base_volume)
    }

    pub fn set_master_volume(&mut self, volume: f64) -> f64 {
        self.master_volume = clamp_unit(volume);
        for index in 0..self.layers.len() {
            self.push_volume(index);
        }
        self.master_volume
    }

    /// Step the master volume up or down (the +/- keys).
    pub fn nudge_master_volume(&mut self, step: f64) -> f64 {
        self.set_master_volume(self.master_volume + step)
    }

    /// Apply one weather step: drift each active layer, then fire the
    /// texture cue if there is one.
    pub fn tick(&mut self, perturbation: &Perturbation) {
        for delta in &perturbation.deltas {
            let Some(index) = self.index_of(&delta.layer_id) else {
                continue;
            };
            if !self.layers[index].active || !delta.delta.is_finite() {
                continue;
            }
            let swing = self.weather_swing;
            let layer = &mut self.layers[index];
            layer.weather_offset = (layer.weather_offset + delta.delta).clamp(-swing, swing);
            self.push_volume(index);
        }

        if let Some(cue) = &perturbation.texture {
            self.play_texture(cue);
        }
    }

    pub fn play_texture(&mut self, cue: &TextureCue) {
        if self.is_output_paused() {
            return;
        }
        let volume = clamp_unit(cue.relative_volume) * self.master_volume;
        self.backend.play_once(&cue.sound_id, volume);
    }

    /// Play a sound effect (e.g. the closing gong) at master volume.
    /// Returns false when the catalog has no such effect.
    pub fn play_sfx(&mut self, sfx_id: &str) -> bool {
        if !self.catalog.has_sfx(sfx_id) {
            return false;
        }
        self.backend.play_once(sfx_id, self.master_volume);
        true
    }

    /// Stop every layer and drop it from the mix.
    pub fn stop_all(&mut self) -> Vec<SoundLayer> {
        for layer in self.layers.iter().filter(|l| l.active) {
            self.backend.stop(&layer.id);
        }
        std::mem::take(&mut self.layers)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn index_of(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn require(&self, id: &str) -> Result<usize, MixerError> {
        self.index_of(id).ok_or_else(|| MixerError::LayerNotFound { id: id.to_string() })
    }

    fn push_volume(&mut self, index: usize) {
        let layer = &self.layers[index];
        if layer.active {
            self.backend
                .set_volume(&layer.id, layer.effective_volume(self.master_volume));
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{AudioCommand, RecordingBackend};
    use crate::weather::LayerDelta;

    fn mixer() -> Mixer<RecordingBackend> {
        Mixer::new(SoundCatalog::builtin(), RecordingBackend::new())
    }

    fn drift(id: &str, delta: f64) -> Perturbation {
        Perturbation {
            intensity: 0.5,
            deltas: vec![LayerDelta {
                layer_id: id.to_string(),
                delta,
            }],
            texture: None,
        }
    }

    #[test]
    fn two_layers_and_clamped_volume() {
        let mut m = mixer();
        m.add_layer("brown_noise").unwrap();
        m.add_layer("rain").unwrap();
        assert_eq!(m.active_count(), 2);

        assert_eq!(m.set_volume("rain", 1.5).unwrap(), 1.0);
        assert_eq!(m.layer("rain").unwrap().base_volume, 1.0);
        assert_eq!(m.set_volume("rain", -0.2).unwrap(), 0.0);
    }

    #[test]
    fn unknown_sound_is_rejected() {
        let mut m = mixer();
        let err = m.add_layer("kazoo").unwrap_err();
        assert_eq!(err, MixerError::UnknownSound { id: "kazoo".into() });
        assert!(m.layers().is_empty());
        assert!(m.backend().commands().is_empty());
    }

    #[test]
    fn add_issues_play_and_volume() {
        let mut m = mixer().with_default_volume(0.8);
        m.add_layer("fire").unwrap();
        assert_eq!(
            m.backend().commands()[0],
            AudioCommand::Play {
                layer_id: "fire".into()
            }
        );
        assert_eq!(m.backend().last_volume("fire"), Some(0.8));
    }

    #[test]
    fn duplicate_add_is_noop() {
        let mut m = mixer();
        m.add_layer("fire").unwrap();
        let issued = m.backend().commands().len();
        m.add_layer("fire").unwrap();
        assert_eq!(m.layers().len(), 1);
        assert_eq!(m.backend().commands().len(), issued);
    }

    #[test]
    fn removing_everything_pauses_output() {
        let mut m = mixer();
        m.add_layer("rain").unwrap();
        assert!(!m.is_output_paused());
        m.remove_layer("rain").unwrap();
        assert!(m.is_output_paused());
        assert!(matches!(
            m.backend().commands().last(),
            Some(AudioCommand::Stop { layer_id }) if layer_id == "rain"
        ));
        assert!(m.remove_layer("rain").is_err());
    }

    #[test]
    fn weather_drift_is_bounded() {
        let mut m = mixer().with_weather_swing(0.1);
        m.add_layer("rain").unwrap();
        m.set_volume("rain", 0.95).unwrap();
        for _ in 0..50 {
            m.tick(&drift("rain", 0.05));
        }
        let layer = m.layer("rain").unwrap();
        assert!((layer.weather_offset - 0.1).abs() < 1e-9);
        assert_eq!(layer.effective_volume(1.0), 1.0);

        for _ in 0..100 {
            m.tick(&drift("rain", -0.05));
        }
        let layer = m.layer("rain").unwrap();
        assert!((layer.weather_offset + 0.1).abs() < 1e-9);
        assert!((m.backend().last_volume("rain").unwrap() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn muted_layers_ignore_weather() {
        let mut m = mixer();
        m.add_layer("rain").unwrap();
        m.set_active("rain", false).unwrap();
        m.tick(&drift("rain", 0.05));
        assert_eq!(m.layer("rain").unwrap().weather_offset, 0.0);
        assert!(m.is_output_paused());

        m.set_active("rain", true).unwrap();
        assert!(!m.is_output_paused());
    }

    #[test]
    fn master_volume_scales_and_clamps() {
        let mut m = mixer().with_default_volume(0.5);
        m.add_layer("lofi").unwrap();
        assert_eq!(m.set_master_volume(0.5), 0.5);
        assert_eq!(m.backend().last_volume("lofi"), Some(0.25));
        assert_eq!(m.nudge_master_volume(0.9), 1.0);
        assert_eq!(m.nudge_master_volume(-2.0), 0.0);
    }

    #[test]
    fn textures_follow_active_layers() {
        let mut m = mixer();
        m.add_layer("omm").unwrap();
        assert_eq!(m.texture_pool(), vec!["big-bell".to_string(), "wind-chimes".to_string()]);

        m.set_master_volume(0.5);
        m.play_texture(&TextureCue {
            sound_id: "big-bell".into(),
            relative_volume: 0.4,
        });
        assert_eq!(
            m.backend().commands().last(),
            Some(&AudioCommand::PlayOnce {
                sound_id: "big-bell".into(),
                volume: 0.2
            })
        );
    }

    #[test]
    fn stop_all_clears_mix() {
        let mut m = mixer();
        m.add_layer("rain").unwrap();
        m.add_layer("city").unwrap();
        let stopped = m.stop_all();
        assert_eq!(stopped.len(), 2);
        assert!(m.layers().is_empty());
        assert!(m.play_sfx("gong"));
        assert!(!m.play_sfx("airhorn"));
    }
}
