//! Sound catalog.
//!
//! The catalog is the set of sound ids a session may layer. It ships with the
//! built-in soundscapes and can also be scanned from an assets directory,
//! where every `.wav`, `.mp3` or `.ogg` file becomes a loop keyed by its stem.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "ogg"];

/// Keywords that mark a loop as weather rather than ambience.
const WEATHER_KEYWORDS: [&str; 6] = ["rain", "thunder", "wind", "storm", "sea", "water"];

const EMOJIS: [(&str, &str); 10] = [
    ("rain", "🌧️"),
    ("fire", "🔥"),
    ("cafe", "☕"),
    ("coffee", "☕"),
    ("brown", "🤎"),
    ("city", "🏙️"),
    ("water", "💧"),
    ("sea", "🌊"),
    ("lofi", "🎧"),
    ("omm", "🧘"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCategory {
    Ambient,
    Weather,
}

impl SoundCategory {
    /// Guess the category from an id or file stem.
    pub fn infer(id: &str) -> Self {
        let lower = id.to_lowercase();
        if WEATHER_KEYWORDS.iter().any(|k| lower.contains(k)) {
            SoundCategory::Weather
        } else {
            SoundCategory::Ambient
        }
    }
}

/// A loopable sound known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDef {
    pub id: String,
    pub name: String,
    pub category: SoundCategory,
    /// One-shot texture ids that may be sprinkled over this loop.
    #[serde(default)]
    pub textures: Vec<String>,
}

impl SoundDef {
    pub fn new(id: &str, category: SoundCategory, textures: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: display_name(id),
            category,
            textures: textures.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn emoji(&self) -> &'static str {
        emoji_for(&self.id)
    }
}

/// Registry of loops, one-shot textures and sound effects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundCatalog {
    sounds: BTreeMap<String, SoundDef>,
    #[serde(default)]
    sfx: Vec<String>,
}

impl SoundCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The soundscapes bundled with focusnoise.
    pub fn builtin() -> Self {
        use SoundCategory::{Ambient, Weather};

        let defs = [
            SoundDef::new("brown_noise", Ambient, &["keyboard", "page-turn", "vinyl-crackle"]),
            SoundDef::new(
                "city",
                Ambient,
                &["distant-ambulance-siren", "distant-train", "bike-bell", "door-open-close-with-bell"],
            ),
            SoundDef::new(
                "coffee_shop",
                Ambient,
                &["espresso-steam", "pouring-coffee", "spoon-and-cup", "cup-and-saucer", "cash-register"],
            ),
            SoundDef::new(
                "fire",
                Ambient,
                &["page-turn", "vinyl-crackle", "crickets", "owl", "winter-wind"],
            ),
            SoundDef::new("flowing_water", Weather, &["frog", "wind-chimes", "distant-thunder"]),
            SoundDef::new("gentle_rain", Weather, &["distant-thunder", "winter-wind", "wind-chimes"]),
            SoundDef::new("lofi", Ambient, &["vinyl-crackle", "keyboard", "page-turn", "big-bell"]),
            SoundDef::new("omm", Ambient, &["big-bell", "wind-chimes"]),
            SoundDef::new("rain", Weather, &["distant-thunder", "winter-wind"]),
            SoundDef::new("sea_wave", Weather, &["seagull", "distant-foghorn", "winter-wind"]),
        ];

        let mut catalog = Self::empty();
        for def in defs {
            catalog.insert(def);
        }
        catalog.sfx.push("gong".to_string());
        catalog
    }

    /// Build a catalog from the audio files found directly inside `dir`.
    ///
    /// Files under `dir/sfx` are registered as sound effects. Loops whose
    /// names match a built-in soundscape inherit its textures.
    ///
    /// # Errors
    /// Returns an error if `dir` cannot be read.
    pub fn scan(dir: &Path) -> std::io::Result<Self> {
        let builtin = Self::builtin();
        let mut catalog = Self::empty();

        for stem in audio_stems(dir)? {
            let id = stem.to_lowercase().replace([' ', '-'], "_");
            let textures = builtin.textures_matching(&id);
            catalog.insert(SoundDef {
                name: display_name(&stem),
                category: SoundCategory::infer(&id),
                id,
                textures,
            });
        }

        let sfx_dir = dir.join("sfx");
        if sfx_dir.is_dir() {
            catalog.sfx = audio_stems(&sfx_dir)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, def: SoundDef) {
        self.sounds.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&SoundDef> {
        self.sounds.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    pub fn has_sfx(&self, id: &str) -> bool {
        self.sfx.iter().any(|s| s == id)
    }

    /// Sounds in stable id order.
    pub fn sounds(&self) -> impl Iterator<Item = &SoundDef> {
        self.sounds.values()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Resolve a menu selection: either a 1-based index into [`Self::sounds`]
    /// or a sound id.
    pub fn resolve(&self, selector: &str) -> Option<&SoundDef> {
        let selector = selector.trim();
        if let Ok(index) = selector.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| self.sounds.values().nth(i));
        }
        self.get(selector)
    }

    /// Textures linked to a loop id. Names are matched loosely in both
    /// directions so `heavy_rain` still picks up the `rain` textures.
    fn textures_matching(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        for def in self.sounds.values() {
            if id.contains(&def.id) || def.id.contains(id) {
                for texture in &def.textures {
                    if !out.contains(texture) {
                        out.push(texture.clone());
                    }
                }
            }
        }
        out
    }
}

/// "coffee_shop" -> "Coffee Shop"
pub fn display_name(stem: &str) -> String {
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn emoji_for(id: &str) -> &'static str {
    let lower = id.to_lowercase();
    EMOJIS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, emoji)| *emoji)
        .unwrap_or("🎵")
}

fn audio_stems(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_audio = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if let (true, Some(stem)) = (is_audio, path.file_stem().and_then(|s| s.to_str())) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}
