use focusnoise_core::AudioBackend;

/// Audio backend that only logs what it is asked to play. Real playback is
/// left to an external player; the mix decisions are visible with
/// `RUST_LOG=focusnoise=debug`.
#[derive(Debug, Default)]
pub struct TracingAudioBackend;

impl AudioBackend for TracingAudioBackend {
    fn play(&mut self, layer_id: &str) {
        tracing::debug!(layer_id, "play");
    }

    fn stop(&mut self, layer_id: &str) {
        tracing::debug!(layer_id, "stop");
    }

    fn set_volume(&mut self, layer_id: &str, volume: f64) {
        tracing::trace!(layer_id, volume, "set volume");
    }

    fn play_once(&mut self, sound_id: &str, volume: f64) {
        tracing::debug!(sound_id, volume, "play once");
    }
}
