//! Audio layer mixer.
//!
//! The mixer decides what should be audible and how loud; an
//! [`AudioBackend`] turns those decisions into sound.

mod backend;
mod catalog;
mod mixer;

pub use backend::{AudioBackend, AudioCommand, RecordingBackend};
pub use catalog::{display_name, emoji_for, SoundCatalog, SoundCategory, SoundDef};
pub use mixer::{Mixer, SoundLayer};
