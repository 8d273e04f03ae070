mod engine;

pub use engine::{SessionTimer, TimerSnapshot, TimerState};
