//! End-to-end flight scenarios: roster → scene → frames.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_core::{Clock, ManualClock};
use flight::{
    run_frames, Collaborators, DirSource, EngineConfig, FlightEngine, RosterBuilder, Scene, SceneMode, SceneOptions,
    ShipRecord, Viewport,
};
use renderer::{CanvasId, RasterCanvas, RecordingCanvas, SpriteCache, SpriteImage, DEFAULT_SHIP_URL};

const FRAME: Duration = Duration::from_micros(16_670);

fn engine(clock: &ManualClock, seed: u64) -> Arc<FlightEngine> {
    let sprites = SpriteCache::new("/nonexistent", DEFAULT_SHIP_URL);
    sprites.insert_decoded(DEFAULT_SHIP_URL, SpriteImage::solid(6, 6, [220, 230, 255, 255]));
    let config = EngineConfig {
        seed: Some(seed),
        ..EngineConfig::default()
    };
    Arc::new(FlightEngine::new(config, Arc::new(clock.clone()), sprites))
}

fn twelve_ships() -> Vec<ShipRecord> {
    (0..12)
        .map(|i| {
            ShipRecord::new(format!("S{i:02}"))
                .with_fit(i as f32 * 8.0)
                .with_firepower(i as f32 * 9.0)
                .with_threat(50.0)
                .elite(i < 3)
                .mission(i == 5)
                .support(i == 7)
        })
        .collect()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flight-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn loading_scene_survives_120_frames() {
    let clock = ManualClock::new();
    for seed in [1, 2, 3] {
        let options = SceneOptions {
            mode: SceneMode::Loading,
            roster: twelve_ships(),
            viewport: Viewport::new(800.0, 600.0, 1.0),
            ..SceneOptions::default()
        };
        let mut scene = Scene::new(engine(&clock, seed), RecordingCanvas::new(CanvasId::new("splash"), 800, 600), options);
        assert_eq!(scene.ships().len(), 12);

        let frames = run_frames(&mut scene, &clock, 120, FRAME);
        assert_eq!(frames, 120);

        for ship in scene.ships() {
            let m = ship.margin();
            assert!(ship.pos.x.is_finite() && ship.pos.y.is_finite());
            assert!(ship.pos.x >= -m && ship.pos.x <= 800.0 + m, "{} x={}", ship.ticker, ship.pos.x);
            assert!(ship.pos.y >= -m && ship.pos.y <= 600.0 + m, "{} y={}", ship.ticker, ship.pos.y);
            assert!(ship.trail.len() <= ship.max_trail);
        }
        let shortest = scene.ships().iter().min_by_key(|s| s.max_trail).unwrap();
        assert_eq!(shortest.trail.len(), frames.min(shortest.max_trail));
    }
}

#[test]
fn formations_fire_during_a_long_run() {
    let clock = ManualClock::new();
    let options = SceneOptions {
        roster: twelve_ships(),
        ..SceneOptions::default()
    };
    let mut scene = Scene::new(engine(&clock, 11), RecordingCanvas::new(CanvasId::new("c"), 800, 600), options);
    // Loading mode forms up every 4 s.
    run_frames(&mut scene, &clock, 60 * 9, FRAME);
    assert_eq!(scene.formations(), 2);
}

#[test]
fn focus_dims_everyone_else() {
    let clock = ManualClock::new();
    let e = engine(&clock, 5);
    let options = SceneOptions {
        mode: SceneMode::Ambient,
        roster: twelve_ships(),
        ..SceneOptions::default()
    };
    let mut scene = Scene::new(e.clone(), RecordingCanvas::new(CanvasId::new("c"), 800, 600), options);
    e.set_focus("S04", Duration::from_millis(1000));
    assert_eq!(e.focused_ticker().as_deref(), Some("S04"));
    run_frames(&mut scene, &clock, 30, FRAME);
    assert_eq!(e.focused_ticker().as_deref(), Some("S04"));
    run_frames(&mut scene, &clock, 40, FRAME);
    assert_eq!(e.focused_ticker(), None);
}

#[test]
fn roster_from_disk_feeds_a_raster_scene() {
    let data = scratch_dir("data");
    std::fs::write(
        data.join("stats.json"),
        r#"{"RKLB": {"d1": 4.2, "m1": 31}, "LUNR": {"d1": "-1.5"}, "ASTS": {"d1": 2.0}}"#,
    )
    .unwrap();
    std::fs::write(
        data.join("manifest.json"),
        r#"{"tickers": [{"ticker": "RKLB"}, {"ticker": "LUNR"}, {"ticker": "ASTS"}, {"ticker": "SPCE", "status": "LOCKED"}]}"#,
    )
    .unwrap();

    let clock = ManualClock::new();
    let e = engine(&clock, 9);
    let roster = pollster::block_on(RosterBuilder::default().build(
        &DirSource::new(&data),
        &Collaborators::none(),
        e.sprites(),
    ));
    assert_eq!(roster.len(), 3);
    assert!(roster.iter().all(|r| r.is_elite));

    let options = SceneOptions {
        roster,
        viewport: Viewport::new(320.0, 200.0, 2.0),
        ..SceneOptions::default()
    };
    let mut scene = Scene::new(e.clone(), RasterCanvas::new(CanvasId::new("splash"), 1, 1), options);
    // Three real ships plus generic padding.
    assert_eq!(scene.ships().len(), 6);
    scene.signal_ready(clock.now());
    run_frames(&mut scene, &clock, 30, FRAME);

    let canvas = scene.canvas();
    assert_eq!(canvas.image().dimensions(), (640, 400));
    let lit = canvas.image().pixels().filter(|p| p[0] > 40 || p[1] > 40 || p[2] > 60).count();
    assert!(lit > 0, "nothing was drawn");

    let _ = std::fs::remove_dir_all(&data);
}
