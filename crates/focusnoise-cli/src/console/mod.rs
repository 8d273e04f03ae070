//! Terminal glue: the renderer, the logging audio backend, the event log
//! and stdin controls.

mod audio;
mod hacker;
mod input;
mod render;

pub use audio::TracingAudioBackend;
pub use hacker::HackerLog;
pub use input::spawn_controls;
pub use render::TerminalRenderer;
