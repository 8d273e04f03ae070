use std::path::Path;

use focusnoise_core::{Config, SoundCatalog};

/// The configured assets directory, or the built-in sounds.
pub fn load_catalog(config: &Config) -> Result<SoundCatalog, Box<dyn std::error::Error>> {
    match config.audio.assets_dir.as_deref() {
        Some(dir) => {
            let catalog = SoundCatalog::scan(Path::new(dir))
                .map_err(|e| format!("cannot scan assets dir {dir}: {e}"))?;
            if catalog.is_empty() {
                return Err(format!("no .wav, .mp3 or .ogg files in {dir}").into());
            }
            Ok(catalog)
        }
        None => Ok(SoundCatalog::builtin()),
    }
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = load_catalog(&config)?;

    if json {
        let sounds: Vec<_> = catalog.sounds().collect();
        println!("{}", serde_json::to_string_pretty(&sounds)?);
        return Ok(());
    }

    for (i, sound) in catalog.sounds().enumerate() {
        println!(
            "{:>3}. {} {:<16} {:<8} {}",
            i + 1,
            sound.emoji(),
            sound.name,
            format!("{:?}", sound.category).to_lowercase(),
            sound.id
        );
    }
    Ok(())
}
