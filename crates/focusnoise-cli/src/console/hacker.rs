use std::io::Write;

use chrono::{Local, Timelike};
use focusnoise_core::{Event, EventSink};

const STREAK_MILESTONES: [u32; 3] = [3, 7, 30];

/// Prints terse log lines for the interesting events, plus the occasional
/// easter egg. Ticks are left to the renderer.
pub struct HackerLog {
    streak_before: u32,
}

impl HackerLog {
    pub fn new(streak_before: u32) -> Self {
        Self { streak_before }
    }

    /// The lines to print for one event; empty for events that stay quiet.
    pub fn lines_for(&mut self, event: &Event) -> Vec<String> {
        match event {
            Event::TimerStarted { total_secs, at } => {
                let mut lines = vec![format!("[init] focus daemon up, {}m on the clock", total_secs / 60)];
                let hour = at.with_timezone(&Local).hour();
                if hour < 5 {
                    lines.push("[egg ] burning the midnight oil. respect.".into());
                }
                lines
            }
            Event::TimerPaused { .. } => vec!["[sig ] SIGSTOP received, holding".into()],
            Event::TimerResumed { .. } => vec!["[sig ] SIGCONT, back at it".into()],
            Event::TimerExtended { added_secs, .. } => {
                vec![format!("[sys ] lease extended by {}m", added_secs / 60)]
            }
            Event::LayerAdded { layer_id, .. } => {
                vec![format!("[mnt ] mounting /dev/audio/{layer_id}")]
            }
            Event::LayerRemoved { layer_id } => {
                vec![format!("[mnt ] unmounted /dev/audio/{layer_id}")]
            }
            Event::LayerToggled { layer_id, active } => vec![format!(
                "[mix ] {layer_id} {}",
                if *active { "unmuted" } else { "muted" }
            )],
            Event::TexturePlayed { sound_id, .. } => vec![format!("[env ] {sound_id} detected")],
            Event::TimerCompleted { .. } => vec!["[done] exit 0. session complete".into()],
            Event::TimerAborted { elapsed_secs, .. } => vec![format!(
                "[kill] session terminated after {}m {:02}s",
                elapsed_secs / 60,
                elapsed_secs % 60
            )],
            Event::StatsRecorded {
                credited_secs,
                rank_before,
                rank_after,
                streak_days,
                ..
            } => {
                let mut lines = vec![format!("[disk] +{}m focus written", credited_secs / 60)];
                if rank_before != rank_after {
                    lines.push(format!(
                        "[root] *** PRIVILEGE ESCALATION: {rank_before} -> {rank_after} ***"
                    ));
                }
                if *streak_days > self.streak_before && STREAK_MILESTONES.contains(streak_days) {
                    lines.push(format!("[egg ] {streak_days} day streak. uptime looks good."));
                }
                self.streak_before = *streak_days;
                lines
            }
            Event::StatsNotSaved { reason, .. } => {
                vec![format!("[disk] write failed ({reason}), stats left as they were")]
            }
            Event::Tick { .. } | Event::MasterVolumeChanged { .. } => Vec::new(),
        }
    }
}

impl EventSink for HackerLog {
    fn emit(&mut self, event: &Event) {
        let lines = self.lines_for(event);
        if lines.is_empty() {
            return;
        }
        let mut err = std::io::stderr().lock();
        for line in lines {
            // Clear the status line first; the renderer redraws it.
            let _ = writeln!(err, "\r\x1b[K{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn recorded(before: &str, after: &str, streak: u32) -> Event {
        Event::StatsRecorded {
            credited_secs: 1500,
            rank_before: before.into(),
            rank_after: after.into(),
            streak_days: streak,
            at: Utc::now(),
        }
    }

    #[test]
    fn promotion_banner() {
        let mut log = HackerLog::new(0);
        let lines = log.lines_for(&recorded("Script Kiddie", "Shell Wrangler", 1));
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("PRIVILEGE ESCALATION"));
    }

    #[test]
    fn streak_milestone_only_when_reached() {
        let mut log = HackerLog::new(2);
        let lines = log.lines_for(&recorded("Time Lord", "Time Lord", 3));
        assert!(lines.iter().any(|l| l.contains("3 day streak")));

        let mut same_day = HackerLog::new(3);
        let lines = same_day.lines_for(&recorded("Time Lord", "Time Lord", 3));
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn ticks_are_quiet() {
        let mut log = HackerLog::new(0);
        let tick = Event::Tick {
            remaining_secs: 10,
            weather_intensity: 0.5,
            at: Utc::now(),
        };
        assert!(log.lines_for(&tick).is_empty());
    }

    #[test]
    fn layer_mount_lines() {
        let mut log = HackerLog::new(0);
        let lines = log.lines_for(&Event::LayerAdded {
            layer_id: "rain".into(),
            name: "Rain".into(),
        });
        assert_eq!(lines, vec!["[mnt ] mounting /dev/audio/rain".to_string()]);
    }
}
