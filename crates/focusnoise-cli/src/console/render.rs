use std::io::Write;

use focusnoise_core::audio::emoji_for;
use focusnoise_core::{DisplaySnapshot, RenderBackend, TimerState};

const BAR_WIDTH: usize = 24;

/// One status line: bar, time left, sounds, weather and volume.
pub fn format_frame(frame: &DisplaySnapshot) -> String {
    let filled = ((frame.progress() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled));

    let sounds = if frame.active_layers.is_empty() {
        "(silence)".to_string()
    } else {
        frame
            .active_layers
            .iter()
            .map(|name| format!("{} {name}", emoji_for(&name.replace(' ', "_"))))
            .collect::<Vec<_>>()
            .join(" + ")
    };

    let tag = match frame.state {
        TimerState::Paused => " PAUSED",
        _ => "",
    };

    format!(
        "[{bar}] {:02}:{:02} left{tag} | {sounds} | weather {:>3}% | vol {:>3}%",
        frame.remaining_secs / 60,
        frame.remaining_secs % 60,
        (frame.weather_intensity * 100.0).round() as u32,
        (frame.master_volume * 100.0).round() as u32,
    )
}

/// Redraws a single status line in place.
pub struct TerminalRenderer<W: Write> {
    out: W,
    tasks: Vec<String>,
    started: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, tasks: Vec<String>) -> Self {
        Self {
            out,
            tasks,
            started: false,
        }
    }

    /// Leave the status line behind.
    pub fn finish(&mut self) {
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "focusnoise :: p pause  +/- volume  e N extend  m ID mute  q quit")?;
        for (i, task) in self.tasks.iter().enumerate() {
            writeln!(self.out, "  {}. {task}", i + 1)?;
        }
        Ok(())
    }
}

impl<W: Write> RenderBackend for TerminalRenderer<W> {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        if !self.started {
            self.started = true;
            if let Err(e) = self.header() {
                tracing::debug!(error = %e, "header not drawn");
            }
        }
        let _ = write!(self.out, "\r{}\x1b[K", format_frame(snapshot));
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(remaining: u64, state: TimerState) -> DisplaySnapshot {
        DisplaySnapshot {
            state,
            remaining_secs: remaining,
            total_secs: 1500,
            active_layers: vec!["Brown Noise".into(), "Rain".into()],
            weather_intensity: 0.42,
            master_volume: 0.8,
        }
    }

    #[test]
    fn frame_line() {
        let line = format_frame(&frame(750, TimerState::Running));
        assert!(line.starts_with("[############............]"));
        assert!(line.contains("12:30 left"));
        assert!(line.contains("🤎 Brown Noise + 🌧️ Rain"));
        assert!(line.contains("weather  42%"));
        assert!(line.contains("vol  80%"));
    }

    #[test]
    fn paused_and_silent() {
        let mut f = frame(60, TimerState::Paused);
        f.active_layers.clear();
        let line = format_frame(&f);
        assert!(line.contains("PAUSED"));
        assert!(line.contains("(silence)"));
    }

    #[test]
    fn header_once_with_tasks() {
        let mut r = TerminalRenderer::new(Vec::new(), vec!["write report".into()]);
        r.render(&frame(10, TimerState::Running));
        r.render(&frame(9, TimerState::Running));
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out.matches("focusnoise ::").count(), 1);
        assert!(out.contains("1. write report"));
        assert!(out.contains("00:09 left"));
    }
}
