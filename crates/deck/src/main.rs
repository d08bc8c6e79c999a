//! Flight deck: renders the Space Capital flight scene headlessly to PNG frames.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{DeckConfig, Preferences};
use engine_core::{Clock, ManualClock};
use flight::{
    Collaborators, DirSource, EngineConfig, FlightEngine, FrameStatus, Progression, RosterBuilder, Scene,
    SceneOptions, StaticMissions, Viewport,
};
use renderer::{CanvasId, RasterCanvas, SpriteCache, DEFAULT_SHIP_URL};

/// Extra glow for the user's own ship.
struct SelectedShipGlow {
    ticker: String,
}

impl Progression for SelectedShipGlow {
    fn glow_boost(&self, ticker: &str) -> f32 {
        if ticker == self.ticker {
            0.5
        } else {
            0.0
        }
    }
}

fn collaborators(config: &DeckConfig, prefs: &Preferences) -> Collaborators {
    let mut collab = Collaborators::none();
    if !config.missions.is_empty() || !config.support.is_empty() {
        collab = collab.with_missions(Arc::new(StaticMissions::new(
            config.missions.iter().cloned(),
            config.support.iter().cloned(),
        )));
    }
    if let Some(ticker) = &prefs.selected_ship {
        collab = collab.with_progression(Arc::new(SelectedShipGlow { ticker: ticker.clone() }));
    }
    collab
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DeckConfig::load();
    let prefs = Preferences::load();
    let engine_config = match &config.engine_config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };

    log::info!(
        "Starting flight deck: {:?} mode, {}x{} @{}x, {} frames",
        config.mode,
        config.width,
        config.height,
        config.dpr,
        config.frames
    );

    let clock = ManualClock::new();
    let sprites = SpriteCache::new(&config.asset_root, DEFAULT_SHIP_URL);
    let engine = Arc::new(FlightEngine::new(engine_config, Arc::new(clock.clone()), sprites));
    let collab = collaborators(&config, &prefs);

    let roster = pollster::block_on(RosterBuilder::new(config.roster.clone()).build(
        &DirSource::new(&config.data_dir),
        &collab,
        engine.sprites(),
    ));

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))?;

    let options = SceneOptions {
        mode: config.mode,
        roster,
        viewport: Viewport::new(config.width, config.height, config.dpr),
        reduced_motion: prefs.performance_mode,
        is_mobile: config.is_mobile(),
        collaborators: collab,
        on_ready: Some(Box::new(|| log::info!("Uplink ready"))),
    };
    let mut scene = Scene::new(engine.clone(), RasterCanvas::new(CanvasId::new("flight"), 1, 1), options);

    match (&prefs.selected_ship, config.focus_ms) {
        (Some(ticker), 0) => engine.pin_focus(ticker),
        (Some(ticker), ms) => engine.set_focus(ticker, Duration::from_millis(ms)),
        (None, _) => {}
    }
    scene.signal_ready(clock.now());
    scene.start(clock.now());

    let frame = engine.config().nominal_frame();
    let mut written = 0;
    let mut ran = 0;
    for i in 1..=config.frames {
        clock.advance(frame);
        if scene.tick(clock.now()) == FrameStatus::Stopped {
            break;
        }
        ran = i;
        let due = if config.every == 0 { i == config.frames } else { i % config.every == 0 };
        if due {
            let path = config.output_dir.join(format!("frame_{i:05}.png"));
            scene
                .canvas()
                .save_png(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            written += 1;
        }
    }

    log::info!(
        "Rendered {} frames ({} formations), wrote {} PNGs to {}",
        ran,
        scene.formations(),
        written,
        config.output_dir.display()
    );
    scene.stop();
    Ok(())
}
