pub mod completions;
pub mod config;
pub mod play;
pub mod sounds;
pub mod stats;
