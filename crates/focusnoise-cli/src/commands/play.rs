use std::sync::Arc;

use clap::Args;
use focusnoise_core::{
    run_session, Config, FileStatsStore, Ledger, MemoryStatsStore, SessionEngine, SoundCatalog,
    StatsStore, WeatherFrequency,
};
use tokio::sync::mpsc;

use super::sounds::load_catalog;
use crate::console::{spawn_controls, HackerLog, TerminalRenderer, TracingAudioBackend};

const MAX_TASKS: usize = 3;

#[derive(Args)]
pub struct PlayArgs {
    /// Sound ids or menu numbers, comma or space separated (see `focusnoise sounds`)
    #[arg(required = true)]
    pub sounds: Vec<String>,
    /// Session length in minutes [default: session.default_minutes]
    #[arg(long, short)]
    pub minutes: Option<u64>,
    /// Starting volume, 0-100 [default: audio.master_volume]
    #[arg(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,
    /// Fixed weather seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// How often texture one-shots play
    #[arg(long)]
    pub frequency: Option<WeatherFrequency>,
    /// Something to work on, shown beside the timer (up to 3)
    #[arg(long = "task", short)]
    pub tasks: Vec<String>,
    /// Do not write stats
    #[arg(long)]
    pub no_save: bool,
    /// Print the receipt as JSON
    #[arg(long)]
    pub json: bool,
}

/// Resolve selectors against the catalog, skipping unknown ones and
/// duplicates. Returns the ids in selection order.
pub fn select_sounds(catalog: &SoundCatalog, selectors: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for selector in selectors.iter().flat_map(|s| s.split(',')) {
        let selector = selector.trim();
        if selector.is_empty() {
            continue;
        }
        match catalog.resolve(selector) {
            Some(def) if !ids.contains(&def.id) => ids.push(def.id.clone()),
            Some(_) => {}
            None => eprintln!("warning: no sound '{selector}', skipping"),
        }
    }
    ids
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = load_catalog(&config)?;

    let selected = select_sounds(&catalog, &args.sounds);
    if selected.is_empty() {
        return Err("no valid sounds selected".into());
    }

    let minutes = args.minutes.unwrap_or(config.session.default_minutes);
    let total_secs = minutes
        .checked_mul(60)
        .filter(|s| *s > 0)
        .ok_or("session must be at least one minute")?;

    let mut settings = config.session_settings();
    if let Some(seed) = args.seed {
        settings.weather_seed = Some(seed);
    }
    if let Some(frequency) = args.frequency {
        settings.weather.frequency = frequency;
    }
    if let Some(pct) = args.volume {
        settings.master_volume = f64::from(pct) / 100.0;
    }

    let store: Arc<dyn StatsStore> = if args.no_save {
        Arc::new(MemoryStatsStore::new())
    } else {
        Arc::new(FileStatsStore::open_default()?)
    };
    let ledger = Ledger::new(config.ranks.clone(), settings.credit, store);
    let mut stats = ledger.load_or_reset()?;

    let mut engine = SessionEngine::new(settings, catalog, TracingAudioBackend, total_secs)?;
    engine.observe(HackerLog::new(stats.current_streak_days));
    for id in &selected {
        engine.add_layer(id)?;
    }

    let tasks: Vec<String> = args.tasks.into_iter().take(MAX_TASKS).collect();
    let mut renderer = TerminalRenderer::new(std::io::stderr(), tasks);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async {
        let (tx, mut rx) = mpsc::channel(16);
        spawn_controls(tx);
        run_session(&mut engine, &mut renderer, &mut rx, &ledger, &mut stats).await
    });
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_background();
    renderer.finish();

    let receipt = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!("{receipt}");
    }
    Ok(())
}
